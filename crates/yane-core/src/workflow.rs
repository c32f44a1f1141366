use crate::archive::{download_and_archive, BundleSet};
use crate::error::{Error, Result};
use crate::model::{ExportFormat, FileId, ScanId, ScanRecord};
use crate::poller::{poll_until_ready, request_export, PollConfig};
use crate::progress::ExportReporter;
use crate::service::ScanService;
use crate::session::Session;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// What to do when one (scan, format) export fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure.
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining pairs.
    Continue,
}

#[derive(Debug)]
pub struct ArchivedReport {
    pub file_id: FileId,
    pub entry: String,
    pub bundle: PathBuf,
    pub poll_attempts: u32,
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub scan_id: ScanId,
    pub scan_name: String,
    pub format: ExportFormat,
    pub result: std::result::Result<ArchivedReport, Error>,
}

#[derive(Debug, Default)]
pub struct ExportSummary {
    pub outcomes: Vec<ExportOutcome>,
}

impl ExportSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Drives request -> poll -> download -> archive for every scan and format,
/// one pair at a time.
pub struct ExportWorkflow<'a, S: ScanService> {
    service: &'a S,
    session: &'a Session,
    poll: PollConfig,
    policy: FailurePolicy,
    staging_dir: PathBuf,
    reporter: &'a dyn ExportReporter,
}

impl<'a, S: ScanService> ExportWorkflow<'a, S> {
    pub fn new(service: &'a S, session: &'a Session, reporter: &'a dyn ExportReporter) -> Self {
        Self {
            service,
            session,
            poll: PollConfig::default(),
            policy: FailurePolicy::Abort,
            staging_dir: PathBuf::from("."),
            reporter,
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Scan-major, format-minor. Under `FailurePolicy::Abort` the first
    /// failing pair is returned as the error.
    pub fn export_collection(&self, scans: &[ScanRecord], bundles: &BundleSet) -> Result<ExportSummary> {
        let formats: Vec<ExportFormat> = bundles.formats().collect();
        let started = Instant::now();
        let mut summary = ExportSummary::default();
        self.reporter.on_export_start(scans.len() * formats.len());

        for scan in scans {
            for &format in &formats {
                let bundle = bundles
                    .path(format)
                    .ok_or_else(|| Error::Other(format!("no bundle for format {}", format)))?;
                info!("saving reports to ZIP file: {}", bundle.display());

                match self.export_one(scan, format, bundle) {
                    Ok(report) => {
                        self.reporter.on_archived(scan, format, &report.entry, bundle);
                        summary.outcomes.push(ExportOutcome {
                            scan_id: scan.id,
                            scan_name: scan.name.clone(),
                            format,
                            result: Ok(report),
                        });
                    }
                    Err(e) if self.policy == FailurePolicy::Continue => {
                        error!("export of scan {} as {} failed: {}", scan.id, format, e);
                        self.reporter.on_pair_failed(scan, format, &e.to_string());
                        summary.outcomes.push(ExportOutcome {
                            scan_id: scan.id,
                            scan_name: scan.name.clone(),
                            format,
                            result: Err(e),
                        });
                    }
                    Err(e) => {
                        self.reporter.on_pair_failed(scan, format, &e.to_string());
                        return Err(e);
                    }
                }
            }
        }

        self.reporter.on_export_complete(
            summary.succeeded(),
            summary.failed(),
            started.elapsed().as_secs_f64(),
        );
        Ok(summary)
    }

    fn export_one(&self, scan: &ScanRecord, format: ExportFormat, bundle: &Path) -> Result<ArchivedReport> {
        let file_id = request_export(self.service, self.session, scan.id, format)?;
        self.reporter.on_export_requested(scan, format, file_id);

        let poll_attempts = poll_until_ready(
            self.service,
            self.session,
            scan.id,
            file_id,
            &self.poll,
            |attempt| self.reporter.on_poll(scan, format, attempt),
        )?;

        let entry = download_and_archive(
            self.service,
            self.session,
            scan,
            file_id,
            format,
            bundle,
            &self.staging_dir,
        )?;

        Ok(ArchivedReport {
            file_id,
            entry,
            bundle: bundle.to_path_buf(),
            poll_attempts,
        })
    }
}
