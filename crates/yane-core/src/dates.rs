use crate::error::{Error, Result};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::fmt;
use tracing::info;

pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// How a scan's modification date is tested against the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMatch {
    /// `date >= start || date <= end`. Admits every date when start <= end.
    #[default]
    Lenient,
    /// `start <= date <= end`.
    Inclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        Error::DateRange(format!("{}: expected mm/dd/yyyy ({})", value, e))
    })
}

impl DateWindow {
    /// Start defaults to the day before `today`, end defaults to `today`.
    pub fn build(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self> {
        let start = match start {
            None => today - Days::new(1),
            Some(value) => {
                let date = parse_date(value)?;
                if date > today {
                    return Err(Error::DateRange(format!(
                        "{} is greater than the system date {}",
                        value,
                        today.format(DATE_FORMAT)
                    )));
                }
                date
            }
        };

        let end = match end {
            None => today,
            Some(value) => parse_date(value)?,
        };

        let window = Self::new(start, end)?;
        info!(
            "exporting scans between {} and {} ({} day(s))",
            window.start.format(DATE_FORMAT),
            window.end.format(DATE_FORMAT),
            window.days()
        );
        Ok(window)
    }

    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::DateRange(format!(
                "the end date {} is before the start date {}",
                end.format(DATE_FORMAT),
                start.format(DATE_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn admits(&self, date: NaiveDate, policy: WindowMatch) -> bool {
        match policy {
            WindowMatch::Lenient => date >= self.start || date <= self.end,
            WindowMatch::Inclusive => self.start <= date && date <= self.end,
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}
