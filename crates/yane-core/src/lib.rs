pub mod archive;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod model;
pub mod poller;
pub mod progress;
pub mod service;
pub mod session;
pub mod workflow;

pub use config::{load_configuration, ExportConfig};
pub use dates::{DateWindow, WindowMatch};
pub use engine::{ExportEngine, RunReport, RunRequest};
pub use error::Error;
pub use model::{ExportFormat, ScanRecord, ScanStatus};
pub use progress::{ExportReporter, SilentReporter};
pub use service::{MockService, NessusClient, ScanService};
pub use session::{RunClock, Session, SessionManager};
pub use workflow::{ExportSummary, FailurePolicy};
