//! Starts the target process and reports its lifecycle.
//!
//! After spawning, two tasks run side by side:
//!
//! - the exit watcher waits on the child and emits `Exited` / `Crashed`
//! - the readiness task polls the [`ReadinessProbe`] and emits `Ready`
//!
//! The exit watcher is registered before readiness is awaited, so an early
//! exit stops the polling and no `Ready` follows it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use launchkit_core::{LauncherConfig, StorageService};

use crate::error::LauncherError;
use crate::readiness::{wait_for_ready, Readiness, ReadinessPolicy, ReadinessProbe};
use crate::status::LifecycleEvent;

pub struct Supervisor {
    working_dir: Option<PathBuf>,
    arguments: Option<String>,
    application_root: PathBuf,
    storage: StorageService,
    probe: Arc<dyn ReadinessProbe>,
    policy: ReadinessPolicy,
}

/// Handles to the tasks watching one started process.
pub struct SupervisedProcess {
    pub pid: Option<u32>,
    pub working_dir: PathBuf,
    exit_watcher: JoinHandle<()>,
    readiness: JoinHandle<()>,
}

impl SupervisedProcess {
    /// Wait for both watcher tasks to finish.
    pub async fn join(self) -> Result<(), LauncherError> {
        self.exit_watcher
            .await
            .map_err(|e| LauncherError::Task(format!("exit watcher task join failure: {e}")))?;
        self.readiness
            .await
            .map_err(|e| LauncherError::Task(format!("readiness task join failure: {e}")))?;
        Ok(())
    }
}

impl Supervisor {
    pub fn new(
        config: &LauncherConfig,
        storage: StorageService,
        probe: Arc<dyn ReadinessProbe>,
    ) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            arguments: config.arguments.clone(),
            application_root: config.application_root.clone(),
            storage,
            probe,
            policy: ReadinessPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawn `executable` and start watching it. Events go to `events`.
    pub fn start(
        &self,
        executable: &str,
        events: mpsc::Sender<LifecycleEvent>,
    ) -> Result<SupervisedProcess, LauncherError> {
        let working_dir = resolve_working_dir(
            self.working_dir.as_deref(),
            executable,
            &self.application_root,
            &self.storage,
        );

        let mut command = Command::new(executable);
        command.current_dir(&working_dir).stdin(Stdio::null());
        if let Some(arguments) = &self.arguments {
            append_arguments(&mut command, arguments)?;
        }

        tracing::info!(
            executable = %executable,
            working_dir = %working_dir.display(),
            arguments = self.arguments.as_deref().unwrap_or(""),
            "starting application",
        );
        let mut child = command
            .spawn()
            .map_err(|source| LauncherError::ProcessLaunchFailed {
                executable: executable.to_string(),
                source,
            })?;
        let pid = child.id();
        tracing::info!(pid = ?pid, "application started");

        let (exited_tx, mut exited_rx) = watch::channel(false);

        let exit_watcher = {
            let events = events.clone();
            tokio::spawn(async move {
                let event = match child.wait().await {
                    Ok(status) => {
                        tracing::info!(code = ?status.code(), "application exited");
                        LifecycleEvent::Exited {
                            code: status.code(),
                        }
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to wait for application");
                        LifecycleEvent::Crashed {
                            message: err.to_string(),
                        }
                    }
                };
                let _ = exited_tx.send(true);
                let _ = events.send(event).await;
            })
        };

        let readiness = {
            let probe = self.probe.clone();
            let policy = self.policy;
            tokio::spawn(async move {
                let Some(pid) = pid else {
                    return;
                };
                match wait_for_ready(probe.as_ref(), pid, policy, &mut exited_rx).await {
                    Readiness::Ready { .. } | Readiness::TimedOut => {
                        let has_exited = *exited_rx.borrow();
                        if !has_exited {
                            let _ = events.send(LifecycleEvent::Ready).await;
                        }
                    }
                    Readiness::Exited => {}
                }
            })
        };

        Ok(SupervisedProcess {
            pid,
            working_dir,
            exit_watcher,
            readiness,
        })
    }
}

/// Pick the working directory for `executable`.
///
/// Configured directory, else the executable's existing parent, else the
/// application root. A choice that does not exist falls back to the current
/// version root when one is recorded.
pub fn resolve_working_dir(
    configured: Option<&Path>,
    executable: &str,
    application_root: &Path,
    storage: &StorageService,
) -> PathBuf {
    let chosen = match configured {
        Some(dir) => dir.to_path_buf(),
        None => Path::new(executable)
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty() && parent.is_dir())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| application_root.to_path_buf()),
    };

    if chosen.is_dir() {
        return chosen;
    }

    match storage.get_current_root() {
        Ok(root) => {
            tracing::warn!(
                missing = %chosen.display(),
                fallback = %root,
                "working directory does not exist; using current version root",
            );
            PathBuf::from(root)
        }
        Err(err) => {
            tracing::warn!(
                missing = %chosen.display(),
                error = %err,
                "working directory does not exist and no version root is recorded",
            );
            chosen
        }
    }
}

#[cfg(windows)]
fn append_arguments(command: &mut Command, arguments: &str) -> Result<(), LauncherError> {
    command.raw_arg(arguments);
    Ok(())
}

#[cfg(not(windows))]
fn append_arguments(command: &mut Command, arguments: &str) -> Result<(), LauncherError> {
    command.args(split_arguments(arguments)?);
    Ok(())
}

/// Split a configured argument string the way a POSIX shell would.
#[cfg(not(windows))]
fn split_arguments(arguments: &str) -> Result<Vec<String>, LauncherError> {
    shlex::split(arguments).ok_or_else(|| {
        tracing::error!(arguments = %arguments, "launch arguments have unbalanced quotes");
        LauncherError::InvalidArguments {
            arguments: arguments.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(not(windows))]
    #[test]
    fn quoted_arguments_stay_together() {
        let args = split_arguments(r#"--title "My App" --verbose 'a b'"#).unwrap();
        assert_eq!(args, vec!["--title", "My App", "--verbose", "a b"]);
    }

    #[cfg(not(windows))]
    #[test]
    fn unbalanced_quotes_are_rejected() {
        let err = split_arguments(r#"--title "My App"#).unwrap_err();
        assert!(matches!(err, LauncherError::InvalidArguments { .. }), "got: {err}");
    }

    #[test]
    fn configured_directory_wins() {
        let tmp = TempDir::new().unwrap();
        let storage = StorageService::new(tmp.path().join("root"));
        let dir = resolve_working_dir(Some(tmp.path()), "/nowhere/app.exe", &tmp.path().join("root"), &storage);
        assert_eq!(dir, tmp.path());
    }

    #[test]
    fn executable_parent_is_used_when_it_exists() {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(&root).unwrap();
        let storage = StorageService::new(&root);

        let exe = bin.join("app.exe");
        let dir = resolve_working_dir(None, exe.to_str().unwrap(), &root, &storage);
        assert_eq!(dir, bin);
    }

    #[test]
    fn missing_parent_falls_back_to_application_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(&root).unwrap();
        let storage = StorageService::new(&root);

        let exe = tmp.path().join("gone").join("app.exe");
        let dir = resolve_working_dir(None, exe.to_str().unwrap(), &root, &storage);
        assert_eq!(dir, root);
    }

    #[test]
    fn bare_command_uses_application_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir_all(&root).unwrap();
        let storage = StorageService::new(&root);
        assert_eq!(resolve_working_dir(None, "app.exe", &root, &storage), root);
    }

    #[test]
    fn missing_configured_directory_falls_back_to_current_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        let version_root = tmp.path().join("versions").join("app.1.0.0");
        fs::create_dir_all(&version_root).unwrap();
        let storage = StorageService::new(&root);
        storage.update_current_root(version_root.to_str().unwrap()).unwrap();

        let dir = resolve_working_dir(Some(&tmp.path().join("missing")), "app.exe", &root, &storage);
        assert_eq!(dir, version_root);
    }
}
