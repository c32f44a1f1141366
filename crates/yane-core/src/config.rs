use crate::dates::WindowMatch;
use crate::model::ExportFormat;
use crate::poller::PollConfig;
use crate::workflow::FailurePolicy;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: Option<u32>,
    pub poll_timeout_secs: Option<u64>,
    pub request_timeout_secs: u64,
    pub accept_invalid_certs: bool,
    pub failure_policy: FailurePolicy,
    pub window_match: WindowMatch,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            formats: ExportFormat::ALL.to_vec(),
            poll_interval_secs: 2,
            max_poll_attempts: None,
            poll_timeout_secs: None,
            request_timeout_secs: 300,
            accept_invalid_certs: false,
            failure_policy: FailurePolicy::Abort,
            window_match: WindowMatch::Lenient,
        }
    }
}

impl ExportConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.max_poll_attempts,
            timeout: self.poll_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Loads `Yane.toml` (or `path` when given) and `YANE_*` environment
/// variables over the built-in defaults.
pub fn load_configuration(path: Option<&Path>) -> Result<ExportConfig, ConfigError> {
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Yane").required(false),
    };

    let builder = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("YANE")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("formats"),
        )
        .build()?;
    builder.try_deserialize::<ExportConfig>()
}
