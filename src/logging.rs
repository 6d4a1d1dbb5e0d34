use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the non-blocking file writer alive for the process lifetime.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

fn file_logging_enabled() -> bool {
    matches!(
        std::env::var("ENABLE_FILE_LOGS").ok().as_deref(),
        Some("true") | Some("1")
    )
}

/// Installs the tracing subscriber: stdout always, plus a daily rolling
/// file when ENABLE_FILE_LOGS is set. The returned guard must be held by
/// the caller, dropping it stops the file writer.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = fmt::layer().with_target(true);

    if file_logging_enabled() {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
        let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "wortbot.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .with(file_layer)
            .init();

        Some(FileLogGuard { _guard: guard })
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stdout_layer)
            .init();

        None
    }
}
