//! Persisted version state of one application root.
//!
//! # Storage layout
//!
//! ```text
//! <application root>/
//!   current.txt          committed version
//!   run.bat              committed executable path / launch command
//!   currentroot.txt      committed version root
//!   pendingversion.txt   staged version        (transient)
//!   pendingexe.txt       staged executable     (transient)
//!   pendingroot.txt      staged version root   (transient)
//!   versions/            download destination
//!   logs/launcher.log
//! ```
//!
//! Every value file is written to a `.tmp` sibling and renamed into place, so
//! a reader sees either the old or the new value.
//!
//! The service holds no locks. One launcher per application root is assumed;
//! the pipeline and the auto updater of that launcher are the only writers.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, StorageError};
use crate::paths::{
    self, CURRENT_EXECUTABLE_FILE, CURRENT_ROOT_FILE, CURRENT_VERSION_FILE, LOGS_DIR,
    PENDING_EXECUTABLE_FILE, PENDING_ROOT_FILE, PENDING_VERSION_FILE,
};
use crate::types::VersionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The application root, created if missing.
    pub fn application_root_path(&self) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        Ok(self.root.clone())
    }

    /// `<root>/versions`. Only the root is created here; the versions folder
    /// itself is created by launcher initialization so that its absence keeps
    /// signalling a first launch.
    pub fn versions_folder_path(&self) -> Result<PathBuf, StorageError> {
        Ok(paths::versions_dir(&self.application_root_path()?))
    }

    // -----------------------------------------------------------------------
    // Current state
    // -----------------------------------------------------------------------

    /// The committed version, or an empty string before the first commit.
    pub fn get_current_version(&self) -> Result<String, StorageError> {
        let path = self.file(CURRENT_VERSION_FILE)?;
        let version = read_value(&path)?.unwrap_or_default();
        if !version.is_empty() {
            tracing::info!(file = %path.display(), version = %version, "read current version");
        }
        Ok(version)
    }

    pub fn get_current_executable(&self) -> Result<String, StorageError> {
        self.read_required(CURRENT_EXECUTABLE_FILE, "current executable")
    }

    pub fn get_current_root(&self) -> Result<String, StorageError> {
        self.read_required(CURRENT_ROOT_FILE, "current root")
    }

    pub fn update_current_version(&self, version: &str) -> Result<(), StorageError> {
        self.promote(CURRENT_VERSION_FILE, PENDING_VERSION_FILE, version)
    }

    pub fn update_current_executable(&self, executable: &str) -> Result<(), StorageError> {
        self.promote(CURRENT_EXECUTABLE_FILE, PENDING_EXECUTABLE_FILE, executable)
    }

    pub fn update_current_root(&self, root: &str) -> Result<(), StorageError> {
        self.promote(CURRENT_ROOT_FILE, PENDING_ROOT_FILE, root)
    }

    // -----------------------------------------------------------------------
    // Pending state
    // -----------------------------------------------------------------------

    pub fn get_pending_version(&self) -> Result<String, StorageError> {
        Ok(read_value(&self.file(PENDING_VERSION_FILE)?)?.unwrap_or_default())
    }

    pub fn get_pending_executable(&self) -> Result<String, StorageError> {
        Ok(read_value(&self.file(PENDING_EXECUTABLE_FILE)?)?.unwrap_or_default())
    }

    pub fn get_pending_root(&self) -> Result<String, StorageError> {
        Ok(read_value(&self.file(PENDING_ROOT_FILE)?)?.unwrap_or_default())
    }

    pub fn update_pending_version(&self, version: &str) -> Result<(), StorageError> {
        self.stage(PENDING_VERSION_FILE, version)
    }

    pub fn update_pending_executable(&self, executable: &str) -> Result<(), StorageError> {
        self.stage(PENDING_EXECUTABLE_FILE, executable)
    }

    pub fn update_pending_root(&self, root: &str) -> Result<(), StorageError> {
        self.stage(PENDING_ROOT_FILE, root)
    }

    /// Best-effort removal of every pending file. Failures are logged only.
    pub fn clear_pending(&self) {
        let root = match self.application_root_path() {
            Ok(root) => root,
            Err(err) => {
                tracing::error!(error = %err, "cannot resolve application root to clear pending files");
                return;
            }
        };
        for name in [PENDING_VERSION_FILE, PENDING_EXECUTABLE_FILE, PENDING_ROOT_FILE] {
            remove_pending(&root.join(name));
        }
    }

    // -----------------------------------------------------------------------
    // Whole-root operations
    // -----------------------------------------------------------------------

    /// Delete everything under the application root except `logs/`, which
    /// holds the launcher's own open log file.
    pub fn clean(&self) -> Result<(), StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(locked(&self.root, err)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| locked(&self.root, e))?;
            if entry.file_name() == LOGS_DIR {
                continue;
            }
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| locked(&path, e))?;
            let removed = if file_type.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(locked(&path, err)),
            }
        }

        tracing::info!(root = %self.root.display(), "cleaned application root");
        Ok(())
    }

    /// Every current and pending value, `None` where the file is absent.
    pub fn state_snapshot(&self) -> Result<VersionState, StorageError> {
        let read = |name: &str| -> Result<Option<String>, StorageError> {
            read_value(&self.root.join(name))
        };
        Ok(VersionState {
            current_version: read(CURRENT_VERSION_FILE)?,
            current_executable: read(CURRENT_EXECUTABLE_FILE)?,
            current_root: read(CURRENT_ROOT_FILE)?,
            pending_version: read(PENDING_VERSION_FILE)?,
            pending_executable: read(PENDING_EXECUTABLE_FILE)?,
            pending_root: read(PENDING_ROOT_FILE)?,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn file(&self, name: &str) -> Result<PathBuf, StorageError> {
        Ok(self.application_root_path()?.join(name))
    }

    fn read_required(&self, name: &str, what: &'static str) -> Result<String, StorageError> {
        let path = self.file(name)?;
        match read_value(&path)? {
            Some(value) => Ok(value),
            None => {
                tracing::error!(file = %path.display(), "{what} file is missing; unknown state");
                Err(StorageError::MissingState { what, path })
            }
        }
    }

    /// Write a current value, then drop the matching pending file whether or
    /// not the write succeeded.
    fn promote(&self, current: &str, pending: &str, value: &str) -> Result<(), StorageError> {
        let root = self.application_root_path()?;
        let target = root.join(current);
        tracing::info!(file = %target.display(), value = %value, "updating current value");

        let written = write_value(&target, value);
        if let Err(err) = &written {
            tracing::error!(
                file = %target.display(),
                value = %value,
                error = %err,
                "failed to update current value; removing pending file to clear the invalid state",
            );
        }

        remove_pending(&root.join(pending));
        written
    }

    fn stage(&self, pending: &str, value: &str) -> Result<(), StorageError> {
        let path = self.file(pending)?;
        tracing::info!(file = %path.display(), value = %value, "writing pending value");
        write_value(&path, value)
    }
}

fn read_value(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Write flow: `<name>.tmp` sibling → `rename`.
fn write_value(path: &Path, value: &str) -> Result<(), StorageError> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(io_err(path, std::io::Error::other("invalid state file path")));
    };
    let tmp = path.with_file_name(format!("{name}.tmp"));
    fs::write(&tmp, value).map_err(|e| io_err(&tmp, e))?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }
    Ok(())
}

fn remove_pending(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(file = %path.display(), "removed pending file"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(file = %path.display(), error = %err, "failed to delete pending file")
        }
    }
}

fn locked(path: &Path, source: std::io::Error) -> StorageError {
    tracing::error!(
        path = %path.display(),
        error = %source,
        "failed to clean application root; close the application or restart the computer and try again",
    );
    StorageError::StorageLocked {
        path: path.to_path_buf(),
        source,
    }
}
