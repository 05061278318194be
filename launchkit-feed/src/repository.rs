//! The package-repository capability consumed by the package manager.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::FeedError;

/// Basic-auth credentials for a feed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    /// Service-index URL, or a folder path for local feeds.
    pub location: String,
    pub credentials: Option<Credentials>,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// `http://` and `https://` locations are remote feeds; anything else is a folder.
    pub fn is_remote(&self) -> bool {
        let lower = self.location.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

/// Package metadata as reported by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Identifier with the feed's casing.
    pub id: String,
    /// Latest version the search reported.
    pub version: String,
    /// Name of the [`FeedSource`] that produced this entry.
    pub source_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPackage {
    pub source: FeedSource,
    pub metadata: PackageMetadata,
}

/// Search, version listing and download against one or more feeds.
///
/// Implementations are blocking; async callers run them on the blocking pool.
pub trait PackageRepository: Send + Sync {
    /// Packages whose identifier matches `query`. May include near matches;
    /// callers pick the exact one.
    fn search(&self, query: &str) -> Result<Vec<FoundPackage>, FeedError>;

    /// Every published version of the package, in feed order.
    fn list_versions(&self, metadata: &PackageMetadata) -> Result<Vec<String>, FeedError>;

    /// Download and unpack `version` under `destination`; returns every file
    /// the package produced, the package manifest (`.nupkg`) included.
    fn download(
        &self,
        metadata: &PackageMetadata,
        source: &FeedSource,
        version: &str,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, FeedError>;
}

/// `<destination>/<id>.<version>`, the unpack folder of one version.
pub fn package_folder(destination: &Path, id: &str, version: &str) -> PathBuf {
    destination.join(format!("{id}.{version}"))
}

/// `<id>.<version>.nupkg`, lower-cased as flat containers publish it.
pub fn package_file_name(id: &str, version: &str) -> String {
    format!("{}.{}.nupkg", id.to_ascii_lowercase(), version.to_ascii_lowercase())
}
