#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use launchkit_core::{ConfigMap, LauncherConfig};
use launchkit_feed::{FeedError, FeedSource, FoundPackage, PackageMetadata, PackageRepository};
use launchkit_runtime::{StatusSink, StatusUpdate};

pub const PACKAGE: &str = "Contoso.Viewer";

/// In-memory feed publishing one package whose only file is `tools/app.exe`.
pub struct FakeFeed {
    pub versions: Vec<String>,
    pub script: String,
    pub scans: AtomicUsize,
    pub downloads: Mutex<Vec<String>>,
    /// While set, every search fails like an unreachable feed.
    pub failing: AtomicBool,
}

impl FakeFeed {
    pub fn new(versions: &[&str]) -> Arc<Self> {
        Self::with_script(versions, "#!/bin/sh\nexit 0\n")
    }

    pub fn with_script(versions: &[&str], script: &str) -> Arc<Self> {
        Arc::new(Self {
            versions: versions.iter().map(|v| v.to_string()).collect(),
            script: script.to_string(),
            scans: AtomicUsize::new(0),
            downloads: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        })
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl PackageRepository for FakeFeed {
    fn search(&self, _query: &str) -> Result<Vec<FoundPackage>, FeedError> {
        let failing = self.failing.load(Ordering::SeqCst);
        self.scans.fetch_add(1, Ordering::SeqCst);
        if failing {
            return Err(FeedError::Http {
                url: "memory".into(),
                message: "connection refused".into(),
            });
        }
        Ok(vec![FoundPackage {
            source: FeedSource::new("fake", "memory"),
            metadata: PackageMetadata {
                id: PACKAGE.to_string(),
                version: self.versions.last().cloned().unwrap_or_default(),
                source_name: "fake".into(),
            },
        }])
    }

    fn list_versions(&self, _metadata: &PackageMetadata) -> Result<Vec<String>, FeedError> {
        Ok(self.versions.clone())
    }

    fn download(
        &self,
        metadata: &PackageMetadata,
        _source: &FeedSource,
        version: &str,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, FeedError> {
        self.downloads.lock().unwrap().push(version.to_string());
        let exe = destination
            .join(format!("{}.{version}", metadata.id))
            .join("tools")
            .join("app.exe");
        fs::create_dir_all(exe.parent().unwrap()).unwrap();
        fs::write(&exe, &self.script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
        }
        Ok(vec![exe])
    }
}

/// Records every status update.
#[derive(Default)]
pub struct RecordingStatus {
    pub updates: Mutex<Vec<StatusUpdate>>,
}

impl RecordingStatus {
    pub fn texts(&self) -> Vec<String> {
        self.updates.lock().unwrap().iter().map(|u| u.text.clone()).collect()
    }
}

impl StatusSink for RecordingStatus {
    fn update(&self, update: StatusUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}

pub fn config(root: &Path, extra: &[(&str, &str)]) -> LauncherConfig {
    let mut map = ConfigMap::new();
    map.insert("package".into(), PACKAGE.into());
    map.insert("approot".into(), root.display().to_string());
    for (key, value) in extra {
        map.insert(key.to_string(), value.to_string());
    }
    LauncherConfig::from_map(map, ConfigMap::new()).unwrap()
}

/// Poll `done` every 10 ms, at most 500 times.
pub async fn wait_until(done: impl Fn() -> bool) -> bool {
    for _ in 0..500 {
        if done() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    done()
}
