use std::time::Duration;
use thiserror::Error;

use crate::model::{ExportFormat, FileId, ScanId};

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("folder: {0} not found")]
    CollectionNotFound(String),

    #[error("date error: {0}")]
    DateRange(String),

    #[error("data not found: no scans found for folder: {folder} within the date range of {start} and {end}")]
    NoScans {
        folder: String,
        start: String,
        end: String,
    },

    #[error("export of scan {scan_id} as '{format}' returned no file id")]
    ExportRequest { scan_id: ScanId, format: ExportFormat },

    #[error("export {file_id} of scan {scan_id} not ready after {attempts} status checks ({elapsed:?})")]
    PollTimeout {
        scan_id: ScanId,
        file_id: FileId,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("{message} (HTTP {status})")]
    Transport { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0} - format is http[s]://server:port")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("manifest error: {0}")]
    Manifest(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
