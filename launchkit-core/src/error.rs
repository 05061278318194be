//! Error types for launchkit-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the [`crate::StorageService`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// A state file that must exist after a successful install is absent.
    #[error("{what} file {path} is missing; unknown install state")]
    MissingState { what: &'static str, path: PathBuf },

    /// The application root could not be removed, most likely because the
    /// target application still holds files open.
    #[error("failed to clean {path}; files are likely locked by a running application: {source}")]
    StorageLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while resolving or exporting [`crate::LauncherConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "missing required parameter: {name}. Either add it to a settings file or provide a command line argument"
    )]
    MissingParameter { name: &'static str },

    #[error("invalid value '{value}' for parameter {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("cannot determine the local data directory; pass --approot explicitly")]
    NoDataDirectory,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`StorageError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source,
    }
}
