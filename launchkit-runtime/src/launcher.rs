//! One launch cycle.
//!
//! Pipeline:
//!
//! ```text
//! clean? → commit → initialize → scan → [download → commit] → resolve executable
//!        → start → (Ready → auto updater) → Exited → stop updater
//! ```
//!
//! Every error is caught once in [`Launcher::launch`], logged, and reported to
//! the status sink as a crash.

use std::fs;
use std::sync::Arc;

use tokio::sync::mpsc;

use launchkit_core::{LauncherConfig, StorageService};
use launchkit_feed::{FeedSet, PackageRepository};
use launchkit_staging::{commit, CommitOutcome, PackageManager};

use crate::auto_updater::AutoUpdater;
use crate::error::{io_err, LauncherError};
use crate::readiness::{default_probe, ReadinessPolicy, ReadinessProbe};
use crate::status::{LifecycleEvent, StatusSink, StatusUpdate};
use crate::supervisor::Supervisor;

pub const CRASH_TEXT: &str = "Failed to launch application";

/// How a launch cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchReport {
    Exited { code: Option<i32> },
    Crashed { message: String },
}

impl LaunchReport {
    pub fn is_crash(&self) -> bool {
        matches!(self, LaunchReport::Crashed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialized {
    pub is_first_launch: bool,
    pub current_version: String,
}

pub struct Launcher {
    config: LauncherConfig,
    storage: StorageService,
    manager: Arc<PackageManager>,
    updater: AutoUpdater,
    supervisor: Supervisor,
    status: Arc<dyn StatusSink>,
}

impl Launcher {
    pub fn new(
        config: LauncherConfig,
        repository: Arc<dyn PackageRepository>,
        status: Arc<dyn StatusSink>,
        probe: Arc<dyn ReadinessProbe>,
    ) -> Self {
        let storage = StorageService::new(&config.application_root);
        let manager = Arc::new(PackageManager::new(&config, storage.clone(), repository));
        let updater = AutoUpdater::new(
            storage.clone(),
            manager.clone(),
            config.auto_update_interval_minutes,
        );
        let supervisor = Supervisor::new(&config, storage.clone(), probe);
        Self {
            config,
            storage,
            manager,
            updater,
            supervisor,
            status,
        }
    }

    /// Launcher with feeds from configuration and the platform readiness probe.
    pub fn from_config(
        config: LauncherConfig,
        status: Arc<dyn StatusSink>,
    ) -> Result<Self, LauncherError> {
        let feeds = FeedSet::from_config(&config)?;
        tracing::debug!(feeds = feeds.len(), "feeds configured");
        Ok(Self::new(config, Arc::new(feeds), status, default_probe()))
    }

    pub fn with_readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.supervisor = self.supervisor.with_policy(policy);
        self
    }

    pub fn with_updater(mut self, updater: AutoUpdater) -> Self {
        self.updater = updater;
        self
    }

    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    pub fn manager(&self) -> Arc<PackageManager> {
        self.manager.clone()
    }

    pub fn updater(&self) -> &AutoUpdater {
        &self.updater
    }

    /// Run one full cycle. Never fails; failures become a crash report.
    pub async fn launch(&self) -> LaunchReport {
        match self.run_pipeline().await {
            Ok(report) => report,
            Err(err) => {
                self.updater.stop();
                tracing::error!(
                    error = %err,
                    log = %self.config.log_path().display(),
                    "launch failed",
                );
                self.status.update(StatusUpdate::crashed(CRASH_TEXT));
                LaunchReport::Crashed {
                    message: err.to_string(),
                }
            }
        }
    }

    async fn run_pipeline(&self) -> Result<LaunchReport, LauncherError> {
        if self.config.clean {
            let storage = self.storage.clone();
            blocking("clean", move || Ok(storage.clean()?)).await?;
        }

        self.commit().await?;

        let Initialized {
            is_first_launch,
            current_version,
        } = self.initialize().await?;
        if is_first_launch {
            self.status.update(
                StatusUpdate::message("Preparing for the first launch...").first_launch(true),
            );
        }

        let manager = self.manager.clone();
        let current = current_version.clone();
        let scan = blocking("scan", move || Ok(manager.scan(&current)?)).await?;

        if scan.has_newer {
            if !is_first_launch {
                self.status
                    .update(StatusUpdate::message("Downloading latest version..."));
            }
            let manager = self.manager.clone();
            let latest = scan.latest_version.clone();
            blocking("download", move || Ok(manager.download_version(&latest)?)).await?;
            self.commit().await?;
        }

        let storage = self.storage.clone();
        let executable = blocking("resolve executable", move || {
            Ok(storage.get_current_executable()?)
        })
        .await?;

        self.status
            .update(StatusUpdate::message("Launching...").first_launch(is_first_launch));
        self.run_target(&executable, is_first_launch).await
    }

    /// Promote staged state, or refresh the launch command against the current root.
    pub async fn commit(&self) -> Result<CommitOutcome, LauncherError> {
        let storage = self.storage.clone();
        let launch_command = self.config.launch_command.clone();
        blocking("commit", move || {
            Ok(commit(&storage, launch_command.as_deref())?)
        })
        .await
    }

    /// Detect first launch, create the versions folder and read the current version.
    pub async fn initialize(&self) -> Result<Initialized, LauncherError> {
        let storage = self.storage.clone();
        blocking("initialize", move || {
            let versions = storage.versions_folder_path()?;
            let is_first_launch = !versions.is_dir();
            if is_first_launch {
                tracing::info!(versions = %versions.display(), "first launch; creating versions folder");
                fs::create_dir_all(&versions).map_err(|e| io_err(&versions, e))?;
            }
            let current_version = storage.get_current_version()?;
            Ok(Initialized {
                is_first_launch,
                current_version,
            })
        })
        .await
    }

    async fn run_target(
        &self,
        executable: &str,
        is_first_launch: bool,
    ) -> Result<LaunchReport, LauncherError> {
        let (events_tx, mut events_rx) = mpsc::channel::<LifecycleEvent>(8);
        let process = self.supervisor.start(executable, events_tx)?;

        let report = loop {
            match events_rx.recv().await {
                Some(LifecycleEvent::Ready) => {
                    self.status
                        .update(StatusUpdate::ready().first_launch(is_first_launch));
                    self.updater.start();
                }
                Some(LifecycleEvent::Exited { code }) => {
                    self.updater.stop();
                    self.status
                        .update(StatusUpdate::exiting().first_launch(is_first_launch));
                    break LaunchReport::Exited { code };
                }
                Some(LifecycleEvent::Crashed { message }) => {
                    self.updater.stop();
                    return Err(LauncherError::Task(format!(
                        "lost track of the application: {message}"
                    )));
                }
                None => return Err(LauncherError::ChannelClosed("lifecycle events")),
            }
        };

        process.join().await?;
        Ok(report)
    }
}

/// Run blocking storage/feed work off the async threads.
async fn blocking<T, F>(task: &'static str, work: F) -> Result<T, LauncherError>
where
    F: FnOnce() -> Result<T, LauncherError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| LauncherError::Task(format!("{task} task join failure: {e}")))?
}
