//! Tracing subscriber setup for the launcher binary.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{io_err, LauncherError};
use crate::log_rotation::{rotate_if_needed, MAX_LOG_BYTES, MAX_ROTATED_FILES};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Send all tracing output to `log_path`, rotating it first when oversized.
///
/// Keep the returned guard alive until exit; dropping it flushes the writer.
pub fn init_file_tracing(log_path: &Path) -> Result<WorkerGuard, LauncherError> {
    if let Some(dir) = log_path.parent() {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let rotated = rotate_if_needed(log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES)
        .map_err(|e| io_err(log_path, e))?;

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| io_err(log_path, e))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .try_init();

    if rotated {
        tracing::info!(path = %log_path.display(), "log file rotated");
    }
    Ok(guard)
}
