use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const CURRENT_VERSION_FILE: &str = "current.txt";
pub const CURRENT_EXECUTABLE_FILE: &str = "run.bat";
pub const CURRENT_ROOT_FILE: &str = "currentroot.txt";

pub const PENDING_VERSION_FILE: &str = "pendingversion.txt";
pub const PENDING_EXECUTABLE_FILE: &str = "pendingexe.txt";
pub const PENDING_ROOT_FILE: &str = "pendingroot.txt";

pub const VERSIONS_DIR: &str = "versions";
pub const LOGS_DIR: &str = "logs";
pub const LAUNCHER_LOG: &str = "launcher.log";
pub const SETTINGS_FILE: &str = "appsettings.json";

/// `<local data dir>/<application>` unless an explicit root is given.
pub fn application_root(
    explicit: Option<&Path>,
    application: &str,
) -> Result<PathBuf, ConfigError> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    let data = dirs::data_local_dir().ok_or(ConfigError::NoDataDirectory)?;
    Ok(data.join(application))
}

pub fn versions_dir(root: &Path) -> PathBuf {
    root.join(VERSIONS_DIR)
}

pub fn logs_dir(root: &Path) -> PathBuf {
    root.join(LOGS_DIR)
}

pub fn log_path(root: &Path) -> PathBuf {
    logs_dir(root).join(LAUNCHER_LOG)
}

pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}
