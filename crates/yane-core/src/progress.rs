use crate::model::{ExportFormat, FileId, ScanRecord};
use std::path::Path;

/// Trait for reporting export progress.
///
/// CLI implements with indicatif; tests use `SilentReporter`.
/// All methods have default no-op implementations.
pub trait ExportReporter {
    fn on_export_start(&self, _total_pairs: usize) {}
    fn on_export_requested(&self, _scan: &ScanRecord, _format: ExportFormat, _file_id: FileId) {}
    fn on_poll(&self, _scan: &ScanRecord, _format: ExportFormat, _attempt: u32) {}
    fn on_archived(&self, _scan: &ScanRecord, _format: ExportFormat, _entry: &str, _bundle: &Path) {}
    fn on_pair_failed(&self, _scan: &ScanRecord, _format: ExportFormat, _error: &str) {}
    fn on_export_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
    fn on_manifest_written(&self, _path: &Path, _entries: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ExportReporter for SilentReporter {}
