use crate::error::{Error, Result};
use crate::model::{ExportFormat, ExportStatus, FileId, ScanId};
use crate::service::ScanService;
use crate::session::Session;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Polling cadence for export jobs. With neither cap set, polling waits
/// until the service reports ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
            timeout: None,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.timeout.is_some_and(|limit| elapsed >= limit)
    }
}

pub fn request_export<S: ScanService>(
    service: &S,
    session: &Session,
    scan_id: ScanId,
    format: ExportFormat,
) -> Result<FileId> {
    let file_id = service
        .request_export(session, scan_id, format)?
        .ok_or(Error::ExportRequest { scan_id, format })?;
    debug!("scan {} export as {} queued as file {}", scan_id, format, file_id);
    Ok(file_id)
}

/// Queries the job status until it is ready and returns the number of
/// queries made. `on_attempt` sees each attempt number before its query.
pub fn poll_until_ready<S, F>(
    service: &S,
    session: &Session,
    scan_id: ScanId,
    file_id: FileId,
    config: &PollConfig,
    mut on_attempt: F,
) -> Result<u32>
where
    S: ScanService,
    F: FnMut(u32),
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        on_attempt(attempts);

        if service.export_status(session, scan_id, file_id)? == ExportStatus::Ready {
            debug!(
                "file {} of scan {} ready after {} check(s)",
                file_id, scan_id, attempts
            );
            return Ok(attempts);
        }

        let elapsed = started.elapsed();
        if config.exhausted(attempts, elapsed) {
            return Err(Error::PollTimeout {
                scan_id,
                file_id,
                attempts,
                elapsed,
            });
        }

        trace!("file {} of scan {} not ready, waiting {:?}", file_id, scan_id, config.interval);
        thread::sleep(config.interval);
    }
}
