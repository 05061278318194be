//! NuGet v3 HTTP feed client.
//!
//! Uses two resources from the feed's service index:
//!
//! - `SearchQueryService` for `search`
//! - `PackageBaseAddress/3.0.0` (flat container) for version lists and
//!   `.nupkg` downloads

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::archive;
use crate::error::{io_err, FeedError};
use crate::repository::{
    package_file_name, package_folder, FeedSource, FoundPackage, PackageMetadata,
    PackageRepository,
};

const SEARCH_RESOURCE: &str = "SearchQueryService";
const PACKAGE_BASE_RESOURCE: &str = "PackageBaseAddress/3.0.0";
const USER_AGENT: &str = concat!("launchkit/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
struct Resources {
    search: String,
    package_base: String,
}

#[derive(Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: String,
    version: String,
}

#[derive(Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

pub struct NuGetFeed {
    source: FeedSource,
    agent: ureq::Agent,
    resources: Mutex<Option<Resources>>,
}

impl NuGetFeed {
    pub fn new(source: FeedSource) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(15))
            .timeout_read(Duration::from_secs(300))
            .user_agent(USER_AGENT)
            .build();
        Self {
            source,
            agent,
            resources: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &FeedSource {
        &self.source
    }

    // -----------------------------------------------------------------------
    // HTTP plumbing
    // -----------------------------------------------------------------------

    fn get(&self, url: &str) -> ureq::Request {
        let request = self.agent.get(url);
        match &self.source.credentials {
            Some(creds) => {
                let token = STANDARD.encode(format!("{}:{}", creds.username, creds.password));
                request.set("Authorization", &format!("Basic {token}"))
            }
            None => request,
        }
    }

    /// Send `request`; `Ok(None)` on 404.
    fn call(&self, url: &str, request: ureq::Request) -> Result<Option<ureq::Response>, FeedError> {
        match request.call() {
            Ok(response) => Ok(Some(response)),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(status, _)) => Err(FeedError::Status {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(FeedError::Http {
                url: url.to_string(),
                message: transport.to_string(),
            }),
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        request: ureq::Request,
    ) -> Result<Option<T>, FeedError> {
        let Some(response) = self.call(url, request)? else {
            return Ok(None);
        };
        response
            .into_json::<T>()
            .map(Some)
            .map_err(|e| FeedError::Http {
                url: url.to_string(),
                message: format!("invalid response body: {e}"),
            })
    }

    fn resources(&self) -> Result<Resources, FeedError> {
        let mut cached = self.resources.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resources) = cached.as_ref() {
            return Ok(resources.clone());
        }

        let url = self.source.location.clone();
        tracing::debug!(source = %self.source.name, url = %url, "reading service index");
        let index: ServiceIndex =
            self.get_json(&url, self.get(&url))?
                .ok_or_else(|| FeedError::Status {
                    url: url.clone(),
                    status: 404,
                })?;

        let find = |prefix: &'static str| -> Result<String, FeedError> {
            index
                .resources
                .iter()
                .find(|r| r.kind == prefix || r.kind.starts_with(&format!("{prefix}/")))
                .map(|r| r.id.clone())
                .ok_or_else(|| FeedError::MissingResource {
                    url: url.clone(),
                    resource: prefix,
                })
        };
        let resources = Resources {
            search: find(SEARCH_RESOURCE)?,
            package_base: ensure_trailing_slash(find(PACKAGE_BASE_RESOURCE)?),
        };
        *cached = Some(resources.clone());
        Ok(resources)
    }
}

impl PackageRepository for NuGetFeed {
    fn search(&self, query: &str) -> Result<Vec<FoundPackage>, FeedError> {
        let resources = self.resources()?;
        let request = self
            .get(&resources.search)
            .query("q", query)
            .query("prerelease", "true")
            .query("semVerLevel", "2.0.0");
        let response: SearchResponse = self
            .get_json(&resources.search, request)?
            .unwrap_or(SearchResponse { data: Vec::new() });

        tracing::debug!(
            source = %self.source.name,
            query = %query,
            hits = response.data.len(),
            "searched feed",
        );
        Ok(response
            .data
            .into_iter()
            .map(|entry| FoundPackage {
                source: self.source.clone(),
                metadata: PackageMetadata {
                    id: entry.id,
                    version: entry.version,
                    source_name: self.source.name.clone(),
                },
            })
            .collect())
    }

    fn list_versions(&self, metadata: &PackageMetadata) -> Result<Vec<String>, FeedError> {
        let resources = self.resources()?;
        let url = format!(
            "{}{}/index.json",
            resources.package_base,
            metadata.id.to_ascii_lowercase()
        );
        let index: Option<VersionIndex> = self.get_json(&url, self.get(&url))?;
        Ok(index.map(|i| i.versions).unwrap_or_default())
    }

    fn download(
        &self,
        metadata: &PackageMetadata,
        source: &FeedSource,
        version: &str,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, FeedError> {
        let resources = self.resources()?;
        let id = metadata.id.to_ascii_lowercase();
        let file_name = package_file_name(&metadata.id, version);
        let url = format!(
            "{}{id}/{}/{file_name}",
            resources.package_base,
            version.to_ascii_lowercase()
        );

        let folder = package_folder(destination, &metadata.id, version);
        fs::create_dir_all(&folder).map_err(|e| io_err(&folder, e))?;
        let target = folder.join(&file_name);
        let partial = folder.join(format!("{file_name}.tmp"));

        tracing::info!(
            source = %source.name,
            package = %metadata.id,
            version = %version,
            url = %url,
            "downloading package",
        );
        let response = self
            .call(&url, self.get(&url))?
            .ok_or_else(|| FeedError::VersionNotFound {
                id: metadata.id.clone(),
                version: version.to_string(),
                source_name: source.name.clone(),
            })?;

        let mut reader = response.into_reader();
        let mut file = fs::File::create(&partial).map_err(|e| io_err(&partial, e))?;
        io::copy(&mut reader, &mut file).map_err(|e| io_err(&partial, e))?;
        drop(file);
        fs::rename(&partial, &target).map_err(|e| io_err(&target, e))?;

        archive::unpack_in_place(&target)
    }
}

fn ensure_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
