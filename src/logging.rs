use crate::error::{Result, SyncError};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber. `RUST_LOG` overrides the default level, which is `info`
/// or `debug` when `verbose` is set.
///
/// With a log directory, events go to `tagsync.log` inside it through a non-blocking writer, and the
/// returned guard must be held until exit so that buffered lines are flushed. Without one, events go
/// to stderr.
pub fn init_logging(log_dir: Option<&Path>, verbose: bool) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let Some(log_dir) = log_dir else {
        let subscriber = fmt::Subscriber::builder().with_env_filter(env_filter).with_writer(std::io::stderr).with_target(verbose).finish();
        tracing::subscriber::set_global_default(subscriber).map_err(|e| SyncError::Generic(format!("Failed to install logger: {}", e)))?;
        return Ok(None);
    };

    fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("tagsync")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| SyncError::Generic(format!("Failed to open log file in {}: {}", log_dir.display(), e)))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| SyncError::Generic(format!("Failed to install logger: {}", e)))?;
    Ok(Some(guard))
}
