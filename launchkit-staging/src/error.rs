//! Error types for launchkit-staging.

use thiserror::Error;

use launchkit_core::StorageError;
use launchkit_feed::FeedError;

/// All errors that can arise while scanning, downloading or staging.
#[derive(Debug, Error)]
pub enum StagingError {
    /// No search result matched the package identifier exactly.
    #[error("package {package} was not found on any configured feed")]
    PackageNotFound {
        package: String,
        /// Identifiers the feeds returned instead.
        near_matches: Vec<String>,
    },

    #[error("package {package} has no published versions")]
    NoVersionsAvailable { package: String },

    /// Executable detection found zero or several candidates.
    #[error("expected exactly one .{extension} file in the package, found {found}")]
    AmbiguousExecutable { extension: &'static str, found: usize },

    #[error("cannot resolve launch command '{command}': {reason}")]
    LaunchCommandResolutionFailed { command: String, reason: String },

    /// The download produced no files. Logged, never returned.
    #[error("package {package} {version} contains no files")]
    EmptyPackage { package: String, version: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),
}
