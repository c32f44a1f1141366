use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type FolderId = u64;
pub type ScanId = u64;
pub type FileId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    #[serde(other)]
    Other,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Other => "other",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanRecord {
    pub id: ScanId,
    pub name: String,
    pub status: ScanStatus,
    pub folder_id: FolderId,
    /// Seconds since the Unix epoch.
    pub last_modification_date: i64,
}

impl ScanRecord {
    /// Calendar date of the last modification, in local time.
    pub fn modified_on(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.last_modification_date, 0)
            .map(|utc| utc.with_timezone(&Local).date_naive())
    }
}

/// Body of `GET /scans`. The service sends `null` for empty lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanListing {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub folders: Vec<Folder>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scans: Vec<ScanRecord>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Nessus,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Nessus, ExportFormat::Csv];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Nessus => "nessus",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nessus" => Ok(ExportFormat::Nessus),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!(
                "invalid export format '{}': must be one of nessus, csv",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Ready,
    NotReady,
}

impl ExportStatus {
    pub fn from_wire(status: &str) -> Self {
        if status == "ready" {
            ExportStatus::Ready
        } else {
            ExportStatus::NotReady
        }
    }
}
