//! Error types for launchkit-feed.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while talking to a package feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure (DNS, TLS, connection reset, body decode).
    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// The feed answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The service index lacks a resource the client needs.
    #[error("service index {url} does not advertise a {resource} resource")]
    MissingResource { url: String, resource: &'static str },

    /// `list_versions` / `download` got a package from a source this set does not know.
    #[error("unknown feed source '{name}'")]
    UnknownSource { name: String },

    /// The requested version is not present on the feed.
    #[error("package {id} has no version {version} on feed '{source_name}'")]
    VersionNotFound {
        id: String,
        version: String,
        source_name: String,
    },

    /// A feed configuration file was configured but does not exist.
    #[error("feed configuration file {path} is missing")]
    ConfigMissing { path: PathBuf },

    #[error("failed to parse feed configuration {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid package archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An archive entry would escape the extraction directory.
    #[error("package archive {path} contains unsafe entry '{entry}'")]
    UnsafeEntry { path: PathBuf, entry: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`FeedError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> FeedError {
    FeedError::Io {
        path: path.into(),
        source,
    }
}
