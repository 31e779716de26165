use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "vypysky=debug,tower_http=debug,axum::rejection=trace";
const LOG_DIR: &str = "logs";

/// Installs the global subscriber: human readable output on stdout and,
/// when `to_file` is set, JSON lines in `logs/app.log` rotated daily.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive for the lifetime of the process.
pub fn init_logging(to_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (file_layer, guard) = if to_file {
        let _ = std::fs::create_dir_all(LOG_DIR);
        let file_appender = tracing_appender::rolling::daily(LOG_DIR, "app.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        (Some(fmt::layer().json().with_writer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .init();

    guard
}
