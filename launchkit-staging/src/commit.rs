//! Promotion of staged state to current.

use launchkit_core::{StorageError, StorageService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A staged version became current.
    Promoted { version: String },
    /// Nothing was staged; the current executable was re-derived from the
    /// launch command and the current root.
    Refreshed,
    Unchanged,
}

/// Commit staged state, falling back to a launch-command refresh when
/// nothing is staged.
pub fn commit(
    storage: &StorageService,
    launch_command: Option<&str>,
) -> Result<CommitOutcome, StorageError> {
    if let Some(outcome) = commit_pending(storage)? {
        return Ok(outcome);
    }
    match launch_command {
        Some(command) if refresh_launch_command(storage, command)? => Ok(CommitOutcome::Refreshed),
        _ => Ok(CommitOutcome::Unchanged),
    }
}

/// Promote pending version and executable (and root, when staged) to current.
///
/// Both the version and the executable must be staged for anything to be
/// promoted. Pending files are removed afterwards in every case.
pub fn commit_pending(storage: &StorageService) -> Result<Option<CommitOutcome>, StorageError> {
    let version = storage.get_pending_version()?;
    let executable = storage.get_pending_executable()?;
    let root = storage.get_pending_root()?;

    let outcome = if version.is_empty() || executable.is_empty() {
        if !version.is_empty() || !executable.is_empty() {
            tracing::warn!(
                pending_version = %version,
                pending_executable = %executable,
                "incomplete pending state; discarding",
            );
        }
        Ok(None)
    } else {
        tracing::info!(version = %version, executable = %executable, "committing pending version");
        promote(storage, &version, &executable, &root).map(|()| {
            Some(CommitOutcome::Promoted {
                version: version.clone(),
            })
        })
    };

    storage.clear_pending();
    outcome
}

fn promote(
    storage: &StorageService,
    version: &str,
    executable: &str,
    root: &str,
) -> Result<(), StorageError> {
    storage.update_current_version(version)?;
    storage.update_current_executable(executable)?;
    if !root.is_empty() {
        storage.update_current_root(root)?;
    }
    Ok(())
}

/// Point the current executable at `<current root>/<launch command>`.
///
/// Returns `false` when no current root is recorded.
pub fn refresh_launch_command(
    storage: &StorageService,
    launch_command: &str,
) -> Result<bool, StorageError> {
    let root = match storage.get_current_root() {
        Ok(root) => root,
        Err(StorageError::MissingState { .. }) => {
            tracing::debug!("no current root recorded; launch command not applied");
            return Ok(false);
        }
        Err(err) => return Err(err),
    };

    let executable = std::path::Path::new(&root).join(launch_command);
    tracing::info!(
        root = %root,
        command = %launch_command,
        executable = %executable.display(),
        "applying launch command to current root",
    );
    storage.update_current_executable(&executable.display().to_string())?;
    Ok(true)
}
