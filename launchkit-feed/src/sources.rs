//! Feed sources and the ordered [`FeedSet`] built from launcher configuration.
//!
//! Sources come from, in order:
//!
//! 1. `feedurl` (+ `feeduser` / `feedpassword`)
//! 2. the `nuget` feed configuration file:
//!    `{"sources": [{"name": "..", "url": "..", "username": "..", "password": ".."}]}`
//!
//! With neither, nuget.org is used.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use launchkit_core::LauncherConfig;
use serde::Deserialize;

use crate::error::{io_err, FeedError};
use crate::local::LocalFeed;
use crate::nuget::NuGetFeed;
use crate::repository::{Credentials, FeedSource, FoundPackage, PackageMetadata, PackageRepository};

pub const NUGET_ORG_NAME: &str = "nuget.org";
pub const NUGET_ORG_URL: &str = "https://api.nuget.org/v3/index.json";

#[derive(Debug, Deserialize)]
struct FeedConfigFile {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    name: Option<String>,
    url: String,
    username: Option<String>,
    password: Option<String>,
}

/// Sources configured for a launcher, in search order.
pub fn configured_sources(config: &LauncherConfig) -> Result<Vec<FeedSource>, FeedError> {
    let mut sources = Vec::new();

    if let Some(url) = &config.feed_url {
        let credentials = credentials(config.feed_username.clone(), config.feed_password.clone());
        sources.push(FeedSource::new("feedurl", url.clone()).with_credentials(credentials));
    }

    match &config.feed_config_path {
        Some(path) => sources.extend(load_feed_config(path)?),
        None => tracing::debug!("no feed configuration file set"),
    }

    if sources.is_empty() {
        tracing::debug!(url = NUGET_ORG_URL, "no feeds configured, using the default feed");
        sources.push(FeedSource::new(NUGET_ORG_NAME, NUGET_ORG_URL));
    }
    make_names_unique(&mut sources);
    Ok(sources)
}

/// Suffix repeated source names with `-2`, `-3`, ... so routing by name is unambiguous.
fn make_names_unique(sources: &mut [FeedSource]) {
    let mut taken = HashSet::new();
    for source in sources.iter_mut() {
        if taken.insert(source.name.clone()) {
            continue;
        }
        let mut suffix = 2;
        let mut candidate = format!("{}-{suffix}", source.name);
        while taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{}-{suffix}", source.name);
        }
        tracing::warn!(name = %source.name, renamed = %candidate, "duplicate feed source name");
        source.name = candidate.clone();
        taken.insert(candidate);
    }
}

/// Read sources from a feed configuration file. The file must exist.
pub fn load_feed_config(path: &Path) -> Result<Vec<FeedSource>, FeedError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(FeedError::ConfigMissing {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(path, err)),
    };
    let file: FeedConfigFile =
        serde_json::from_str(&contents).map_err(|source| FeedError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(
        path = %path.display(),
        sources = file.sources.len(),
        "loaded feed configuration",
    );
    Ok(file
        .sources
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let name = entry.name.unwrap_or_else(|| format!("source{}", index + 1));
            FeedSource::new(name, entry.url)
                .with_credentials(credentials(entry.username, entry.password))
        })
        .collect())
}

fn credentials(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    username.map(|username| Credentials {
        username,
        password: password.unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// FeedSet
// ---------------------------------------------------------------------------

/// Ordered feeds behind one [`PackageRepository`].
///
/// Search results from every feed are concatenated in source order;
/// `list_versions` and `download` go to the feed that produced the entry.
pub struct FeedSet {
    feeds: Vec<(String, Box<dyn PackageRepository>)>,
}

impl FeedSet {
    pub fn new() -> Self {
        Self { feeds: Vec::new() }
    }

    pub fn from_config(config: &LauncherConfig) -> Result<Self, FeedError> {
        Ok(Self::from_sources(configured_sources(config)?))
    }

    pub fn from_sources(sources: Vec<FeedSource>) -> Self {
        let mut set = Self::new();
        for source in sources {
            let name = source.name.clone();
            if source.is_remote() {
                set.push(name, Box::new(NuGetFeed::new(source)));
            } else {
                set.push(name, Box::new(LocalFeed::new(source)));
            }
        }
        set
    }

    pub fn push(&mut self, name: impl Into<String>, feed: Box<dyn PackageRepository>) {
        self.feeds.push((name.into(), feed));
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    fn feed(&self, name: &str) -> Result<&dyn PackageRepository, FeedError> {
        self.feeds
            .iter()
            .find(|(feed_name, _)| feed_name == name)
            .map(|(_, feed)| feed.as_ref())
            .ok_or_else(|| FeedError::UnknownSource {
                name: name.to_string(),
            })
    }
}

impl Default for FeedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageRepository for FeedSet {
    fn search(&self, query: &str) -> Result<Vec<FoundPackage>, FeedError> {
        let mut found = Vec::new();
        for (name, feed) in &self.feeds {
            match feed.search(query) {
                Ok(packages) => found.extend(packages),
                Err(err) if self.feeds.len() > 1 => {
                    tracing::warn!(source = %name, error = %err, "feed search failed, trying next feed");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(found)
    }

    fn list_versions(&self, metadata: &PackageMetadata) -> Result<Vec<String>, FeedError> {
        self.feed(&metadata.source_name)?.list_versions(metadata)
    }

    fn download(
        &self,
        metadata: &PackageMetadata,
        source: &FeedSource,
        version: &str,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, FeedError> {
        self.feed(&source.name)?
            .download(metadata, source, version, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launchkit_core::ConfigMap;
    use tempfile::TempDir;

    fn config(pairs: &[(&str, &str)]) -> LauncherConfig {
        let mut map: ConfigMap = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        map.insert("package".into(), "Contoso.Viewer".into());
        map.insert("approot".into(), "/tmp/launchkit-test".into());
        LauncherConfig::from_map(map, ConfigMap::new()).unwrap()
    }

    #[test]
    fn default_source_is_nuget_org() {
        let sources = configured_sources(&config(&[])).unwrap();
        assert_eq!(sources, vec![FeedSource::new(NUGET_ORG_NAME, NUGET_ORG_URL)]);
    }

    #[test]
    fn feed_url_comes_first_with_credentials() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("feeds.json");
        fs::write(&path, r#"{"sources": [{"url": "/srv/drop"}]}"#).unwrap();

        let sources = configured_sources(&config(&[
            ("feedurl", "https://feeds.contoso.com/v3/index.json"),
            ("feeduser", "ci"),
            ("feedpassword", "hunter2"),
            ("nuget", path.to_str().unwrap()),
        ]))
        .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].location, "https://feeds.contoso.com/v3/index.json");
        assert_eq!(sources[0].credentials.as_ref().map(|c| c.password.as_str()), Some("hunter2"));
        assert_eq!(sources[1].name, "source1");
        assert!(!sources[1].is_remote());
    }

    #[test]
    fn configured_but_missing_feed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.json");
        let err = configured_sources(&config(&[("nuget", missing.to_str().unwrap())])).unwrap_err();
        assert!(matches!(err, FeedError::ConfigMissing { .. }), "got: {err}");
    }

    #[test]
    fn duplicate_source_names_route_to_their_own_feed() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();
        fs::write(first.join("contoso.viewer.1.0.0.nupkg"), "").unwrap();
        fs::write(second.join("contoso.viewer.2.0.0.nupkg"), "").unwrap();
        let path = tmp.path().join("feeds.json");
        let second_json = serde_json::to_string(second.to_str().unwrap()).unwrap();
        fs::write(
            &path,
            format!(r#"{{"sources": [{{"name": "feedurl", "url": {second_json}}}]}}"#),
        )
        .unwrap();

        let sources = configured_sources(&config(&[
            ("feedurl", first.to_str().unwrap()),
            ("nuget", path.to_str().unwrap()),
        ]))
        .unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["feedurl", "feedurl-2"]);

        let set = FeedSet::from_sources(sources);
        let found = set.search("Contoso.Viewer").unwrap();
        let versions: Vec<_> = found
            .iter()
            .map(|f| set.list_versions(&f.metadata).unwrap())
            .collect();
        assert_eq!(versions, vec![vec!["1.0.0".to_string()], vec!["2.0.0".to_string()]]);
    }

    #[test]
    fn unknown_source_is_reported() {
        let set = FeedSet::new();
        let metadata = PackageMetadata {
            id: "Contoso.Viewer".into(),
            version: "1.0.0".into(),
            source_name: "gone".into(),
        };
        let err = set.list_versions(&metadata).unwrap_err();
        assert!(matches!(err, FeedError::UnknownSource { .. }), "got: {err}");
    }
}
