use crate::error::Result;
use crate::service::ScanService;
use secrecy::SecretString;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const PROGRAM: &str = concat!("Yet Another Nessus Exporter (yane) v", env!("CARGO_PKG_VERSION"));

/// Start of a run and its closing `end` line, logged at most once.
/// Clones share the same state.
#[derive(Debug, Clone)]
pub struct RunClock {
    started: Instant,
    finished: Arc<AtomicBool>,
}

impl RunClock {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started: Instant) -> Self {
        Self {
            started,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Logs the elapsed time the first time it is called.
    pub fn finish(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("end {} (elapsed time: {:.2?})", PROGRAM, self.elapsed());
    }
}

/// An authenticated session: the capability token and the address it is valid for.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    base_url: String,
}

impl Session {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Owns the run's session. Logs out exactly once, on `terminate` or on drop,
/// and reports the elapsed run time either way.
pub struct SessionManager<'a, S: ScanService> {
    service: &'a S,
    session: Option<Session>,
    clock: RunClock,
    terminated: bool,
}

impl<'a, S: ScanService> SessionManager<'a, S> {
    pub fn new(service: &'a S, clock: RunClock) -> Self {
        Self {
            service,
            session: None,
            clock,
            terminated: false,
        }
    }

    pub fn authenticate(&mut self, username: &str, password: &SecretString) -> Result<&Session> {
        let token = self.service.login(username, password)?;
        info!("connected to {} as {}", self.service.base_url(), username);
        let base_url = self.service.base_url().to_string();
        Ok(&*self.session.insert(Session::new(token, base_url)))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        if let Some(session) = self.session.take() {
            if let Err(e) = self.service.logout(&session) {
                warn!("logout from {} failed: {}", session.base_url(), e);
            }
        }

        self.clock.finish();
    }
}

impl<S: ScanService> Drop for SessionManager<'_, S> {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockService;

    #[test]
    fn test_logout_runs_once_on_drop() {
        let service = MockService::new();
        {
            let mut manager = SessionManager::new(&service, RunClock::start());
            manager
                .authenticate("admin", &SecretString::new("secret".into()))
                .unwrap();
            manager.terminate();
        }
        assert_eq!(service.logout_count(), 1);
    }

    #[test]
    fn test_no_logout_without_login() {
        let service = MockService::new();
        drop(SessionManager::new(&service, RunClock::start()));
        assert_eq!(service.logout_count(), 0);
    }

    #[test]
    fn test_rejected_login_keeps_no_session() {
        let service = MockService::new().with_password("right");
        let mut manager = SessionManager::new(&service, RunClock::start());
        assert!(manager
            .authenticate("admin", &SecretString::new("wrong".into()))
            .is_err());
        assert!(manager.session().is_none());
        drop(manager);
        assert_eq!(service.logout_count(), 0);
    }

    #[test]
    fn test_terminate_finishes_shared_clock_once() {
        let service = MockService::new();
        let clock = RunClock::start();
        let mut manager = SessionManager::new(&service, clock.clone());
        manager
            .authenticate("admin", &SecretString::new("secret".into()))
            .unwrap();
        assert!(!clock.is_finished());
        manager.terminate();
        assert!(clock.is_finished());
        drop(manager);
        assert_eq!(service.logout_count(), 1);
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new("abc123secret", "https://nessus:8834");
        let shown = format!("{:?}", session);
        assert!(!shown.contains("abc123secret"));
        assert!(shown.contains("https://nessus:8834"));
    }
}
