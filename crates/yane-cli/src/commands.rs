use clap::Parser;
use std::path::PathBuf;
use yane_core::{ExportConfig, ExportFormat, FailurePolicy};

#[derive(Debug, Parser)]
#[command(name = "yane", version)]
#[command(about = "Nessus scan exporter", long_about = None)]
pub struct Cli {
    /// Nessus account name to use for downloading scans
    #[arg(short = 'a', long = "account-name")]
    pub account_name: String,

    /// Nessus web site URL and port (e.g. "https://127.0.0.1:8834")
    #[arg(short = 'u', long)]
    pub url: String,

    /// Nessus folder to download scans from
    #[arg(short = 'f', long = "folder-name")]
    pub folder_name: String,

    /// Start date of Nessus scans (mm/dd/yyyy); defaults to the system date minus 1 day
    #[arg(short = 's', long = "scan-startdate")]
    pub scan_startdate: Option<String>,

    /// End date of Nessus scans (mm/dd/yyyy); defaults to the system date
    #[arg(short = 'e', long = "scan-enddate", alias = "scan_enddate")]
    pub scan_enddate: Option<String>,

    /// Export format to request; repeat for several (default: nessus and csv)
    #[arg(long = "format")]
    pub formats: Vec<ExportFormat>,

    /// Directory for ZIP bundles and the manifest
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Skip TLS certificate validation
    #[arg(long)]
    pub insecure: bool,

    /// Keep exporting the remaining scans after a failed export
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,

    /// Give up on an export after this many status checks
    #[arg(long = "max-poll-attempts")]
    pub max_poll_attempts: Option<u32>,

    /// Give up on an export after this many seconds
    #[arg(long = "poll-timeout")]
    pub poll_timeout: Option<u64>,

    /// Configuration file (default: Yane.toml in the working directory, if present)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags override file and environment settings.
    pub fn apply(&self, config: &mut ExportConfig) {
        if !self.formats.is_empty() {
            config.formats.clear();
            for &format in &self.formats {
                if !config.formats.contains(&format) {
                    config.formats.push(format);
                }
            }
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.insecure {
            config.accept_invalid_certs = true;
        }
        if self.continue_on_error {
            config.failure_policy = FailurePolicy::Continue;
        }
        if self.max_poll_attempts.is_some() {
            config.max_poll_attempts = self.max_poll_attempts;
        }
        if self.poll_timeout.is_some() {
            config.poll_timeout_secs = self.poll_timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_arguments() {
        assert!(Cli::try_parse_from(["yane", "-a", "admin", "-u", "https://h:8834"]).is_err());
        let cli = Cli::try_parse_from([
            "yane", "-a", "admin", "-u", "https://h:8834", "-f", "Weekly Scans",
        ])
        .unwrap();
        assert_eq!(cli.folder_name, "Weekly Scans");
        assert!(cli.scan_startdate.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "yane",
            "-a",
            "admin",
            "-u",
            "https://h:8834",
            "-f",
            "Weekly",
            "--format",
            "csv",
            "--insecure",
            "--continue-on-error",
            "--max-poll-attempts",
            "10",
        ])
        .unwrap();

        let mut config = ExportConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.formats, vec![ExportFormat::Csv]);
        assert!(config.accept_invalid_certs);
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(config.max_poll_attempts, Some(10));
        assert_eq!(config.poll_timeout_secs, None);
    }

    #[test]
    fn test_repeated_format_flags_keep_first_order() {
        let cli = Cli::try_parse_from([
            "yane", "-a", "admin", "-u", "https://h:8834", "-f", "Weekly", "--format", "csv",
            "--format", "nessus", "--format", "csv",
        ])
        .unwrap();

        let mut config = ExportConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.formats, vec![ExportFormat::Csv, ExportFormat::Nessus]);
    }
}
