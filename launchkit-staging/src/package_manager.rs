//! Scan feeds for newer versions and stage downloads into the pending slots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use launchkit_core::{LauncherConfig, PackageId, StorageService};
use launchkit_feed::{version, FoundPackage, PackageRepository};

use crate::error::StagingError;

/// Extension of auto-detected launch targets.
pub const EXECUTABLE_EXTENSION: &str = "exe";
/// Extension of the package manifest used to locate the version root.
pub const MANIFEST_EXTENSION: &str = "nupkg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// `latest_version` differs from the current version as a string.
    pub has_newer: bool,
    pub latest_version: String,
}

/// What a downloaded version should launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub executable: PathBuf,
    /// Version root; only known when a launch command override is in use.
    pub root: Option<PathBuf>,
}

pub struct PackageManager {
    package: PackageId,
    launch_command: Option<String>,
    storage: StorageService,
    repository: Arc<dyn PackageRepository>,
}

impl PackageManager {
    pub fn new(
        config: &LauncherConfig,
        storage: StorageService,
        repository: Arc<dyn PackageRepository>,
    ) -> Self {
        Self {
            package: config.package.clone(),
            launch_command: config.launch_command.clone(),
            storage,
            repository,
        }
    }

    pub fn package(&self) -> &PackageId {
        &self.package
    }

    /// Compare the latest published version against `current_version`.
    pub fn scan(&self, current_version: &str) -> Result<ScanResult, StagingError> {
        let found = self.find_package()?;
        let versions = self.repository.list_versions(&found.metadata)?;
        let latest_version = version::latest(&versions)
            .cloned()
            .ok_or_else(|| StagingError::NoVersionsAvailable {
                package: found.metadata.id.clone(),
            })?;

        let has_newer = latest_version != current_version;
        tracing::info!(
            package = %found.metadata.id,
            current = %current_version,
            latest = %latest_version,
            has_newer,
            "scanned for updates",
        );
        Ok(ScanResult {
            has_newer,
            latest_version,
        })
    }

    /// Download `version` into the versions folder and stage it as pending.
    ///
    /// Never touches the current state.
    pub fn download_version(&self, version: &str) -> Result<LaunchTarget, StagingError> {
        let found = self.find_package()?;
        let destination = self.storage.versions_folder_path()?;
        tracing::info!(
            package = %found.metadata.id,
            version = %version,
            destination = %destination.display(),
            "downloading version",
        );

        let files = self
            .repository
            .download(&found.metadata, &found.source, version, &destination)?;
        if files.is_empty() {
            let err = StagingError::EmptyPackage {
                package: found.metadata.id.clone(),
                version: version.to_string(),
            };
            tracing::error!(error = %err, "download produced no files");
        }

        let target = select_launch_target(&files, self.launch_command.as_deref())?;

        self.storage.update_pending_version(version)?;
        self.storage
            .update_pending_executable(&target.executable.display().to_string())?;
        if let Some(root) = &target.root {
            self.storage.update_pending_root(&root.display().to_string())?;
        }
        tracing::info!(
            version = %version,
            executable = %target.executable.display(),
            "staged version",
        );
        Ok(target)
    }

    /// The search result whose id equals the configured package, ignoring case.
    fn find_package(&self) -> Result<FoundPackage, StagingError> {
        let found = self.repository.search(self.package.as_str())?;
        let near_matches: Vec<String> = found
            .iter()
            .filter(|p| !self.package.matches(&p.metadata.id))
            .map(|p| p.metadata.id.clone())
            .collect();

        match found.into_iter().find(|p| self.package.matches(&p.metadata.id)) {
            Some(package) => Ok(package),
            None => {
                for id in &near_matches {
                    tracing::warn!(wanted = %self.package, found = %id, "search returned a different package");
                }
                tracing::error!(package = %self.package, "package not found");
                Err(StagingError::PackageNotFound {
                    package: self.package.to_string(),
                    near_matches,
                })
            }
        }
    }
}

/// Pick the launch target from a downloaded file list.
///
/// Without a launch command, exactly one `.exe` must be present. With one,
/// exactly one `.nupkg` must be present; its folder is the version root and
/// the command is resolved relative to it.
pub fn select_launch_target(
    files: &[PathBuf],
    launch_command: Option<&str>,
) -> Result<LaunchTarget, StagingError> {
    match launch_command {
        None => {
            let executables = with_extension(files, EXECUTABLE_EXTENSION);
            match executables.as_slice() {
                [executable] => Ok(LaunchTarget {
                    executable: executable.to_path_buf(),
                    root: None,
                }),
                other => Err(StagingError::AmbiguousExecutable {
                    extension: EXECUTABLE_EXTENSION,
                    found: other.len(),
                }),
            }
        }
        Some(command) => {
            let manifests = with_extension(files, MANIFEST_EXTENSION);
            let manifest = match manifests.as_slice() {
                [manifest] => *manifest,
                other => {
                    return Err(StagingError::LaunchCommandResolutionFailed {
                        command: command.to_string(),
                        reason: format!(
                            "expected exactly one .{MANIFEST_EXTENSION} file, found {}",
                            other.len()
                        ),
                    })
                }
            };
            let root = manifest
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| StagingError::LaunchCommandResolutionFailed {
                    command: command.to_string(),
                    reason: format!("{} has no parent folder", manifest.display()),
                })?;
            Ok(LaunchTarget {
                executable: root.join(command),
                root: Some(root.to_path_buf()),
            })
        }
    }
}

fn with_extension<'a>(files: &'a [PathBuf], extension: &str) -> Vec<&'a Path> {
    files
        .iter()
        .filter(|f| {
            f.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        })
        .map(PathBuf::as_path)
        .collect()
}
