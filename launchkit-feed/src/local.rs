//! Folder feed: a directory of `<id>.<version>.nupkg` files.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::error::{io_err, FeedError};
use crate::repository::{
    package_file_name, package_folder, FeedSource, FoundPackage, PackageMetadata,
    PackageRepository,
};
use crate::version;

const PACKAGE_EXTENSION: &str = "nupkg";

#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalPackage {
    id: String,
    version: String,
    path: PathBuf,
}

pub struct LocalFeed {
    source: FeedSource,
    folder: PathBuf,
}

impl LocalFeed {
    pub fn new(source: FeedSource) -> Self {
        let folder = PathBuf::from(&source.location);
        Self { source, folder }
    }

    fn packages(&self) -> Result<Vec<LocalPackage>, FeedError> {
        let entries = match fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::warn!(folder = %self.folder.display(), "local feed folder does not exist");
                return Ok(Vec::new());
            }
            Err(err) => return Err(io_err(&self.folder, err)),
        };

        let mut packages = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_err(&self.folder, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PACKAGE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match split_package_name(stem) {
                Some((id, version)) => packages.push(LocalPackage {
                    id: id.to_string(),
                    version: version.to_string(),
                    path: path.clone(),
                }),
                None => tracing::debug!(file = %path.display(), "skipping unrecognized package file"),
            }
        }
        Ok(packages)
    }
}

impl PackageRepository for LocalFeed {
    fn search(&self, query: &str) -> Result<Vec<FoundPackage>, FeedError> {
        let needle = query.to_ascii_lowercase();
        let mut by_id: BTreeMap<String, (String, Vec<String>)> = BTreeMap::new();
        for package in self.packages()? {
            if !package.id.to_ascii_lowercase().contains(&needle) {
                continue;
            }
            by_id
                .entry(package.id.to_ascii_lowercase())
                .or_insert_with(|| (package.id.clone(), Vec::new()))
                .1
                .push(package.version);
        }

        Ok(by_id
            .into_values()
            .filter_map(|(id, versions)| {
                let latest = version::latest(&versions)?.clone();
                Some(FoundPackage {
                    source: self.source.clone(),
                    metadata: PackageMetadata {
                        id,
                        version: latest,
                        source_name: self.source.name.clone(),
                    },
                })
            })
            .collect())
    }

    fn list_versions(&self, metadata: &PackageMetadata) -> Result<Vec<String>, FeedError> {
        Ok(self
            .packages()?
            .into_iter()
            .filter(|p| p.id.eq_ignore_ascii_case(&metadata.id))
            .map(|p| p.version)
            .collect())
    }

    fn download(
        &self,
        metadata: &PackageMetadata,
        source: &FeedSource,
        version: &str,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, FeedError> {
        let package = self
            .packages()?
            .into_iter()
            .find(|p| p.id.eq_ignore_ascii_case(&metadata.id) && p.version.eq_ignore_ascii_case(version))
            .ok_or_else(|| FeedError::VersionNotFound {
                id: metadata.id.clone(),
                version: version.to_string(),
                source_name: source.name.clone(),
            })?;

        let folder = package_folder(destination, &metadata.id, version);
        fs::create_dir_all(&folder).map_err(|e| io_err(&folder, e))?;
        let target = folder.join(package_file_name(&metadata.id, version));
        tracing::info!(
            source = %source.name,
            package = %metadata.id,
            version = %version,
            from = %package.path.display(),
            "copying package from local feed",
        );
        fs::copy(&package.path, &target).map_err(|e| io_err(&target, e))?;

        archive::unpack_in_place(&target)
    }
}

/// Split `Contoso.Viewer.1.2.0` into `("Contoso.Viewer", "1.2.0")`.
///
/// The first dot whose remainder starts with a digit and parses as a version
/// wins, so ids with numeric-looking segments such as `Foo.2D` stay intact.
fn split_package_name(stem: &str) -> Option<(&str, &str)> {
    stem.match_indices('.').find_map(|(index, _)| {
        let (id, rest) = (&stem[..index], &stem[index + 1..]);
        let starts_numeric = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
        (starts_numeric && !id.is_empty() && version::parse_lenient(rest).is_some())
            .then_some((id, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Contoso.Viewer.1.2.0", Some(("Contoso.Viewer", "1.2.0")))]
    #[case("Foo.2D.1.0.0-beta", Some(("Foo.2D", "1.0.0-beta")))]
    #[case("Tool.1.0.0.4", Some(("Tool", "1.0.0.4")))]
    #[case("NoVersion", None)]
    #[case("Bad.latest", None)]
    fn package_names_split_at_the_version(
        #[case] stem: &str,
        #[case] expected: Option<(&str, &str)>,
    ) {
        assert_eq!(split_package_name(stem), expected);
    }
}
