use chrono::Local;
use std::env;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Console at `TRACING_LEVEL` (default info); every debug line, with
/// file:line, to `LOG_DIR/yane-<YYYYMM>.log` so each month gets a new file.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    let log_file = format!("yane-{}.log", Local::now().format("%Y%m"));

    let file_appender = tracing_appender::rolling::never(&log_dir, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_ansi(true)
                .with_filter(filter_layer),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_filter(LevelFilter::DEBUG),
        )
        .init();

    info!("logging to {}", log_dir);

    guard
}
