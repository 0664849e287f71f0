use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log files older than this are removed at startup
const MAX_LOG_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);

#[allow(dead_code)]
pub struct LoggerGuard(Option<WorkerGuard>);

/// Console + daily rolling file logging. Falls back to console only when the
/// log directory cannot be used.
pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> LoggerGuard {
    let log_dir = log_dir.as_ref().to_path_buf();
    let (level, level_valid) = normalize_level(level);

    let builder = EnvFilter::builder().with_default_directive(level.into());
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir);

    let (file_layer, guard, file_error) = match file_appender {
        Ok(appender) => {
            let (non_blocking, guard) = NonBlocking::new(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    if let Some(e) = file_error {
        tracing::warn!("File logging disabled, cannot use {:?}: {}", log_dir, e);
    }

    if !level_valid {
        tracing::warn!("Invalid log level, defaulting to 'info'");
    }

    if guard.is_some() {
        if let Err(e) = cleanup_old_logs(&log_dir, prefix, MAX_LOG_AGE) {
            tracing::warn!("Failed to delete old log file: {}", e);
        }
    }

    LoggerGuard(guard)
}

fn normalize_level(level: &str) -> (LevelFilter, bool) {
    match level.to_lowercase().as_str() {
        "trace" => (LevelFilter::TRACE, true),
        "debug" => (LevelFilter::DEBUG, true),
        "info" => (LevelFilter::INFO, true),
        "warn" => (LevelFilter::WARN, true),
        "error" => (LevelFilter::ERROR, true),
        _ => (LevelFilter::INFO, false),
    }
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        removed += 1;
                        tracing::info!("Old log file deleted: {}", file_name);
                    }
                }
            }
        }
    }
    Ok(removed)
}
