use std::path::PathBuf;

use thiserror::Error;

/// Error surface of one launch cycle.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("failed to start {executable}: {source}")]
    ProcessLaunchFailed {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("launch arguments have unbalanced quotes: {arguments}")]
    InvalidArguments { arguments: String },

    #[error(transparent)]
    Staging(#[from] launchkit_staging::StagingError),

    #[error(transparent)]
    Storage(#[from] launchkit_core::StorageError),

    #[error("feed error: {0}")]
    Feed(#[from] launchkit_feed::FeedError),

    #[error("configuration error: {0}")]
    Config(#[from] launchkit_core::ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Task(String),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LauncherError {
    LauncherError::Io {
        path: path.into(),
        source,
    }
}
