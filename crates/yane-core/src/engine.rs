use crate::archive::BundleSet;
use crate::config::ExportConfig;
use crate::dates::DateWindow;
use crate::error::{Error, Result};
use crate::locator::locate_scans;
use crate::manifest::{build_manifest, manifest_file_name, write_manifest};
use crate::progress::ExportReporter;
use crate::service::ScanService;
use crate::session::{RunClock, SessionManager};
use crate::workflow::{ExportSummary, ExportWorkflow};
use chrono::{Local, NaiveDateTime};
use secrecy::SecretString;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub struct RunRequest {
    pub username: String,
    pub password: SecretString,
    pub folder_name: String,
    pub window: DateWindow,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: ExportSummary,
    pub bundles: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub manifest_entries: usize,
    pub duration: Duration,
}

pub struct ExportEngine {
    config: ExportConfig,
    clock: RunClock,
    run_started: NaiveDateTime,
}

impl ExportEngine {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            clock: RunClock::start(),
            run_started: Local::now().naive_local(),
        }
    }

    /// Share the caller's clock so the run's `end` line is logged once.
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    /// Timestamp used in bundle and manifest names.
    pub fn with_run_timestamp(mut self, run_started: NaiveDateTime) -> Self {
        self.run_started = run_started;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Full run: login, locate scans, export every (scan, format) pair,
    /// then write the manifest. The session is closed on every exit path.
    pub fn run<S: ScanService>(
        &self,
        service: &S,
        request: &RunRequest,
        reporter: &dyn ExportReporter,
    ) -> Result<RunReport> {
        let mut sessions = SessionManager::new(service, self.clock.clone());

        if self.config.formats.is_empty() {
            return Err(Error::Other("no export formats requested".to_string()));
        }
        fs::create_dir_all(&self.config.output_dir)?;

        let bundles = BundleSet::new(
            &self.config.output_dir,
            &request.folder_name,
            self.run_started,
            &self.config.formats,
        );

        let session = sessions.authenticate(&request.username, &request.password)?;

        let listing = service.list_scans(session)?;
        let scans = locate_scans(
            &listing,
            &request.folder_name,
            &request.window,
            self.config.window_match,
        )?;

        let summary = ExportWorkflow::new(service, session, reporter)
            .with_poll_config(self.config.poll_config())
            .with_failure_policy(self.config.failure_policy)
            .with_staging_dir(&self.config.output_dir)
            .export_collection(&scans, &bundles)?;

        let entries = build_manifest(bundles.paths())?;
        debug!("{} manifest entries", entries.len());
        let manifest_path = self
            .config
            .output_dir
            .join(manifest_file_name(&request.folder_name, self.run_started));
        let manifest = write_manifest(&manifest_path, &entries)?;
        if let Some(path) = &manifest {
            reporter.on_manifest_written(path, entries.len());
        }

        let duration = sessions.elapsed();
        sessions.terminate();

        let written: Vec<PathBuf> = bundles
            .paths()
            .filter(|path| path.exists())
            .map(|path| path.to_path_buf())
            .collect();
        info!(
            "{} of {} exports archived into {} bundle(s)",
            summary.succeeded(),
            summary.outcomes.len(),
            written.len()
        );

        Ok(RunReport {
            summary,
            bundles: written,
            manifest,
            manifest_entries: entries.len(),
            duration,
        })
    }
}
