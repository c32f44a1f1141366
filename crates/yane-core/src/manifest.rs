use crate::archive::sanitize_file_name;
use crate::error::Result;
use chrono::NaiveDateTime;
use csv::{QuoteStyle, WriterBuilder};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

pub const MANIFEST_HEADER: [&str; 8] = [
    "ZIP File",
    "File name",
    "Comment",
    "Modified date",
    "System",
    "Create version",
    "Compress size (bytes)",
    "File size (bytes)",
];

/// Host system recorded in an entry's "version made by" field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginSystem {
    Windows,
    Unix,
    Unknown,
}

impl OriginSystem {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => OriginSystem::Windows,
            3 => OriginSystem::Unix,
            _ => OriginSystem::Unknown,
        }
    }
}

impl fmt::Display for OriginSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginSystem::Windows => f.write_str("Windows"),
            OriginSystem::Unix => f.write_str("UNIX"),
            OriginSystem::Unknown => f.write_str("UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub bundle: PathBuf,
    pub file_name: String,
    pub comment: String,
    /// `%Y-%m-%d %H.%M.%S`, empty when the entry carries no valid timestamp.
    pub modified: String,
    pub system: OriginSystem,
    pub create_version: u8,
    pub compressed_size: u64,
    pub file_size: u64,
}

impl ManifestEntry {
    fn record(&self) -> [String; 8] {
        [
            self.bundle.display().to_string(),
            self.file_name.clone(),
            self.comment.clone(),
            self.modified.clone(),
            self.system.to_string(),
            self.create_version.to_string(),
            self.compressed_size.to_string(),
            self.file_size.to_string(),
        ]
    }
}

/// Lists every entry of every bundle, in bundle order. Bundles that were
/// never created are skipped.
pub fn build_manifest<'a, I>(bundles: I) -> Result<Vec<ManifestEntry>>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut entries = Vec::new();

    for bundle in bundles {
        if !bundle.exists() {
            debug!("bundle {} was not created, skipping", bundle.display());
            continue;
        }

        let mut raw = File::open(bundle)?;
        let mut archive = ZipArchive::new(File::open(bundle)?)?;
        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            let (create_version, system_code) = version_made_by(&mut raw, entry.central_header_start())?;
            entries.push(ManifestEntry {
                bundle: bundle.to_path_buf(),
                file_name: entry.name().to_string(),
                comment: entry.comment().to_string(),
                modified: entry
                    .last_modified()
                    .map(|dt| {
                        format!(
                            "{:04}-{:02}-{:02} {:02}.{:02}.{:02}",
                            dt.year(),
                            dt.month(),
                            dt.day(),
                            dt.hour(),
                            dt.minute(),
                            dt.second()
                        )
                    })
                    .unwrap_or_default(),
                system: OriginSystem::from_code(system_code),
                create_version,
                compressed_size: entry.compressed_size(),
                file_size: entry.size(),
            });
        }
    }

    Ok(entries)
}

/// Reads the two-byte "version made by" field of a central directory
/// header: low byte is the zip version, high byte the host system.
fn version_made_by(file: &mut File, central_header_start: u64) -> Result<(u8, u8)> {
    let mut field = [0u8; 2];
    file.seek(SeekFrom::Start(central_header_start + 4))?;
    file.read_exact(&mut field)?;
    Ok((field[0], field[1]))
}

pub fn manifest_file_name(collection: &str, run_started: NaiveDateTime) -> String {
    format!(
        "nessus_scan_export-{}-{}.csv",
        sanitize_file_name(collection),
        run_started.format("%Y%m%d-%H.%M.%S")
    )
}

/// Writes `entries` as tab-separated, fully quoted rows under a header.
/// Writes nothing and returns `None` when there are no entries.
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<Option<PathBuf>> {
    if entries.is_empty() {
        info!("no archived files, manifest not written");
        return Ok(None);
    }

    info!(
        "saving ZIP file information to {} (tab separated file)",
        path.display()
    );
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Always)
        .from_path(path)?;
    writer.write_record(MANIFEST_HEADER)?;
    for entry in entries {
        writer.write_record(entry.record())?;
    }
    writer.flush()?;

    Ok(Some(path.to_path_buf()))
}
