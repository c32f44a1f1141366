mod commands;
mod logging;
mod progress;
mod prompt;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{debug, error, info};
use yane_core::session::PROGRAM;
use yane_core::{
    load_configuration, DateWindow, ExportEngine, NessusClient, RunClock, RunReport, RunRequest,
};

fn main() -> ExitCode {
    let clock = RunClock::start();
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger();
    info!("starting {}", PROGRAM);

    let status = match run(&args, &clock) {
        Ok(report) => {
            print_summary(&report);
            if report.summary.failed() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    };
    // no-op when the engine already closed the run
    clock.finish();
    status
}

fn run(args: &Cli, clock: &RunClock) -> Result<RunReport> {
    let mut config =
        load_configuration(args.config.as_deref()).context("Error loading configuration")?;
    args.apply(&mut config);

    let client = NessusClient::new(&args.url, &config)?;
    let window = DateWindow::build(
        args.scan_startdate.as_deref(),
        args.scan_enddate.as_deref(),
        Local::now().date_naive(),
    )?;
    let password = prompt::read_password(&args.account_name)?;

    let request = RunRequest {
        username: args.account_name.clone(),
        password,
        folder_name: args.folder_name.clone(),
        window,
    };

    let engine = ExportEngine::new(config).with_clock(clock.clone());
    let reporter = CliReporter::new();
    Ok(engine.run(&client, &request, &reporter)?)
}

fn print_summary(report: &RunReport) {
    let summary = &report.summary;
    let seconds = report.duration.as_secs_f64();
    debug!(
        "{} exports archived, {} failed, in {:.2}s",
        summary.succeeded(),
        summary.failed(),
        seconds
    );

    println!();
    println!(
        "{} exports archived, {} failed, in {}",
        summary.succeeded().to_string().green(),
        summary.failed().to_string().red(),
        format!("{:.2}s", seconds).green(),
    );
    for bundle in &report.bundles {
        debug!("bundle: {}", bundle.display());
        println!("  bundle: {}", bundle.display().to_string().cyan());
    }
    if let Some(manifest) = &report.manifest {
        debug!("manifest: {} ({} entries)", manifest.display(), report.manifest_entries);
        println!(
            "  manifest: {} ({} entries)",
            manifest.display().to_string().cyan(),
            report.manifest_entries
        );
    }
    for failure in summary.failures() {
        if let Err(e) = &failure.result {
            error!(
                "scan {} ({}) as {}: {}",
                failure.scan_id, failure.scan_name, failure.format, e
            );
        }
    }
}
