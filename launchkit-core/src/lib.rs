//! launchkit core library: domain types, persisted version state, configuration.
//!
//! Public API surface:
//! - [`types`]: newtypes and launcher-wide enums
//! - [`error`]: [`StorageError`], [`ConfigError`]
//! - [`paths`]: on-disk layout of an application root
//! - [`storage`]: [`StorageService`], the current/pending version state accessor
//! - [`config`]: [`LauncherConfig`] resolution and export

pub mod config;
pub mod error;
pub mod paths;
pub mod storage;
pub mod types;

pub use config::{ConfigMap, LauncherConfig};
pub use error::{ConfigError, StorageError};
pub use storage::StorageService;
pub use types::{ApplicationName, PackageId, ShowLauncher, VersionState};
