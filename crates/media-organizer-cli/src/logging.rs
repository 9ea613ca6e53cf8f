use std::env;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Console gets warnings from the binary only (the run's own log is rendered from its
/// channel); the log file gets everything allowed by `TRACING_LEVEL`.
pub fn init_logger() -> impl Drop {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "./logs/media-organizer.log".to_string());
    let log_file_path = Path::new(&log_file_path);
    let directory = log_file_path.parent().unwrap_or_else(|| Path::new("./"));
    let file_name = log_file_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "media-organizer.log".into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_targets = Targets::new()
        .with_default(Level::WARN)
        .with_target("media_organizer_core", LevelFilter::OFF);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_ansi(true)
                .with_filter(console_targets),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(filter_layer),
        )
        .init();

    info!("Tracing is configured for console and file logging.");

    guard
}
