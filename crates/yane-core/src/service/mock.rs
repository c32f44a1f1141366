//! In-memory scan service.
//!
//! Serves a fixed folder/scan listing and simulates export jobs that become
//! ready after a configurable number of status checks.

use crate::error::{Error, Result};
use crate::model::{
    ExportFormat, ExportStatus, FileId, Folder, ScanId, ScanListing, ScanRecord, ScanStatus,
};
use crate::service::ScanService;
use crate::session::Session;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

const MOCK_TOKEN: &str = "mock-token";

#[derive(Debug)]
struct Job {
    scan_id: ScanId,
    format: ExportFormat,
    checks: u32,
}

#[derive(Debug)]
pub struct MockService {
    base_url: String,
    password: Option<String>,
    listing: ScanListing,
    ready_after: u32,
    no_file_id: HashSet<ScanId>,
    failing_downloads: HashSet<ScanId>,
    jobs: Mutex<HashMap<FileId, Job>>,
    next_file_id: AtomicU64,
    logins: AtomicU32,
    logouts: AtomicU32,
    listings: AtomicU32,
    exports: AtomicU32,
    status_checks: AtomicU32,
    downloads: AtomicU32,
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockService {
    pub fn new() -> Self {
        Self {
            base_url: "https://mock.local:8834".to_string(),
            password: None,
            listing: ScanListing::default(),
            ready_after: 0,
            no_file_id: HashSet::new(),
            failing_downloads: HashSet::new(),
            jobs: Mutex::new(HashMap::new()),
            next_file_id: AtomicU64::new(1000),
            logins: AtomicU32::new(0),
            logouts: AtomicU32::new(0),
            listings: AtomicU32::new(0),
            exports: AtomicU32::new(0),
            status_checks: AtomicU32::new(0),
            downloads: AtomicU32::new(0),
        }
    }

    /// Rejects logins that do not use this password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_folder(mut self, id: u64, name: impl Into<String>) -> Self {
        self.listing.folders.push(Folder {
            id,
            name: name.into(),
        });
        self
    }

    pub fn with_scan(
        mut self,
        id: ScanId,
        name: impl Into<String>,
        folder_id: u64,
        status: ScanStatus,
        last_modification_date: i64,
    ) -> Self {
        self.listing.scans.push(ScanRecord {
            id,
            name: name.into(),
            status,
            folder_id,
            last_modification_date,
        });
        self
    }

    /// Number of `NotReady` answers each job gives before it reports ready.
    pub fn with_ready_after(mut self, checks: u32) -> Self {
        self.ready_after = checks;
        self
    }

    /// Export requests for this scan come back without a file id.
    pub fn without_file_id(mut self, scan_id: ScanId) -> Self {
        self.no_file_id.insert(scan_id);
        self
    }

    /// Downloads for this scan fail with a transport error.
    pub fn with_failing_download(mut self, scan_id: ScanId) -> Self {
        self.failing_downloads.insert(scan_id);
        self
    }

    /// Content served for an export of `scan_id` in `format`.
    pub fn payload(scan_id: ScanId, format: ExportFormat) -> Vec<u8> {
        format!("<report scan=\"{}\" format=\"{}\"/>\n", scan_id, format).into_bytes()
    }

    pub fn login_count(&self) -> u32 {
        self.logins.load(Ordering::Relaxed)
    }

    pub fn logout_count(&self) -> u32 {
        self.logouts.load(Ordering::Relaxed)
    }

    pub fn listing_count(&self) -> u32 {
        self.listings.load(Ordering::Relaxed)
    }

    pub fn export_count(&self) -> u32 {
        self.exports.load(Ordering::Relaxed)
    }

    pub fn status_check_count(&self) -> u32 {
        self.status_checks.load(Ordering::Relaxed)
    }

    pub fn download_count(&self) -> u32 {
        self.downloads.load(Ordering::Relaxed)
    }

    fn check_session(&self, session: &Session) -> Result<()> {
        if session.token() == MOCK_TOKEN {
            Ok(())
        } else {
            Err(Error::Transport {
                status: 401,
                message: "Invalid Credentials".to_string(),
            })
        }
    }

    fn lock_jobs(&self) -> Result<std::sync::MutexGuard<'_, HashMap<FileId, Job>>> {
        self.jobs
            .lock()
            .map_err(|e| Error::Other(format!("mock job table poisoned: {}", e)))
    }
}

impl ScanService for MockService {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn login(&self, _username: &str, password: &SecretString) -> Result<String> {
        if let Some(expected) = &self.password {
            if password.expose_secret() != expected.as_str() {
                return Err(Error::Authentication("Invalid Credentials".to_string()));
            }
        }
        self.logins.fetch_add(1, Ordering::Relaxed);
        Ok(MOCK_TOKEN.to_string())
    }

    fn logout(&self, session: &Session) -> Result<()> {
        self.check_session(session)?;
        self.logouts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn list_scans(&self, session: &Session) -> Result<ScanListing> {
        self.check_session(session)?;
        self.listings.fetch_add(1, Ordering::Relaxed);
        Ok(self.listing.clone())
    }

    fn request_export(
        &self,
        session: &Session,
        scan_id: ScanId,
        format: ExportFormat,
    ) -> Result<Option<FileId>> {
        self.check_session(session)?;
        self.exports.fetch_add(1, Ordering::Relaxed);
        if self.no_file_id.contains(&scan_id) {
            return Ok(None);
        }
        let file_id = self.next_file_id.fetch_add(1, Ordering::Relaxed);
        self.lock_jobs()?.insert(
            file_id,
            Job {
                scan_id,
                format,
                checks: 0,
            },
        );
        Ok(Some(file_id))
    }

    fn export_status(
        &self,
        session: &Session,
        scan_id: ScanId,
        file_id: FileId,
    ) -> Result<ExportStatus> {
        self.check_session(session)?;
        self.status_checks.fetch_add(1, Ordering::Relaxed);
        let mut jobs = self.lock_jobs()?;
        let job = jobs
            .get_mut(&file_id)
            .filter(|job| job.scan_id == scan_id)
            .ok_or_else(|| Error::Transport {
                status: 404,
                message: "The requested file was not found".to_string(),
            })?;
        if job.checks >= self.ready_after {
            Ok(ExportStatus::Ready)
        } else {
            job.checks += 1;
            Ok(ExportStatus::NotReady)
        }
    }

    fn download(&self, session: &Session, scan_id: ScanId, file_id: FileId) -> Result<Vec<u8>> {
        self.check_session(session)?;
        self.downloads.fetch_add(1, Ordering::Relaxed);
        if self.failing_downloads.contains(&scan_id) {
            return Err(Error::Transport {
                status: 500,
                message: "download failed".to_string(),
            });
        }
        let jobs = self.lock_jobs()?;
        let job = jobs
            .get(&file_id)
            .filter(|job| job.scan_id == scan_id && job.checks >= self.ready_after)
            .ok_or_else(|| Error::Transport {
                status: 409,
                message: "The requested file is not ready".to_string(),
            })?;
        Ok(Self::payload(job.scan_id, job.format))
    }
}
