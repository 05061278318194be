//! Launcher configuration.
//!
//! Resolution merges three layers into one flat key-value map; later layers
//! win:
//!
//! 1. `appsettings.json` next to the launcher binary (optional)
//! 2. command-line launch arguments
//! 3. `<application root>/appsettings.json` (optional)
//!
//! The application root used to locate layer 3 is computed from layers 1–2.
//! The result is an immutable [`LauncherConfig`] handed to every component.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::ConfigError;
use crate::paths;
use crate::types::{ApplicationName, PackageId, ShowLauncher};

/// Flat, lower-cased key → value map.
pub type ConfigMap = BTreeMap<String, String>;

pub const DEFAULT_AUTO_UPDATE_INTERVAL_MINUTES: i64 = 3;

/// Recognized parameter names.
pub mod keys {
    pub const PACKAGE: &str = "package";
    pub const APP: &str = "app";
    pub const NUGET: &str = "nuget";
    pub const GUI: &str = "gui";
    pub const APPROOT: &str = "approot";
    pub const CMD: &str = "cmd";
    pub const INTERVAL: &str = "interval";
    pub const CLEAN: &str = "clean";
    pub const WORKINGDIR: &str = "workingdir";
    pub const ARGS: &str = "args";
    pub const FEEDURL: &str = "feedurl";
    pub const FEEDUSER: &str = "feeduser";
    pub const FEEDPASSWORD: &str = "feedpassword";
    pub const EXPORTPATH: &str = "exportpath";

    pub const ALL: [&str; 14] = [
        PACKAGE, APP, NUGET, GUI, APPROOT, CMD, INTERVAL, CLEAN, WORKINGDIR, ARGS, FEEDURL,
        FEEDUSER, FEEDPASSWORD, EXPORTPATH,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub package: PackageId,
    pub application: ApplicationName,
    pub feed_config_path: Option<PathBuf>,
    pub show_launcher: ShowLauncher,
    pub application_root: PathBuf,
    /// Launch command relative to the version root; replaces executable detection.
    pub launch_command: Option<String>,
    pub auto_update_interval_minutes: i64,
    pub clean: bool,
    pub working_dir: Option<PathBuf>,
    pub arguments: Option<String>,
    pub feed_url: Option<String>,
    pub feed_username: Option<String>,
    pub feed_password: Option<String>,
    pub export_path: Option<PathBuf>,
    /// Layer 2 as given, kept for export.
    pub launch_arguments: ConfigMap,
    /// All layers merged.
    pub resolved: ConfigMap,
    pub default_settings_path: Option<PathBuf>,
    pub application_settings_path: PathBuf,
}

impl LauncherConfig {
    /// Resolve the configuration from all three layers.
    pub fn resolve(
        default_settings_path: Option<&Path>,
        launch_arguments: ConfigMap,
    ) -> Result<Self, ConfigError> {
        let mut merged = ConfigMap::new();
        if let Some(path) = default_settings_path {
            merged.extend(load_settings_file(path)?);
        }
        merged.extend(normalize(&launch_arguments));

        let (_, _, application_root) = identity(&merged)?;
        let application_settings_path = paths::settings_path(&application_root);
        merged.extend(load_settings_file(&application_settings_path)?);

        let mut config = Self::from_map(merged, launch_arguments)?;
        config.default_settings_path = default_settings_path.map(Path::to_path_buf);
        config.application_settings_path = application_settings_path;
        Ok(config)
    }

    /// Build a configuration from an already merged map.
    pub fn from_map(resolved: ConfigMap, launch_arguments: ConfigMap) -> Result<Self, ConfigError> {
        let (package, application, application_root) = identity(&resolved)?;

        let show_launcher = match optional(&resolved, keys::GUI) {
            Some(value) => value.parse().map_err(|reason| ConfigError::InvalidValue {
                name: keys::GUI,
                value: value.clone(),
                reason,
            })?,
            None => ShowLauncher::default(),
        };

        let auto_update_interval_minutes = match optional(&resolved, keys::INTERVAL) {
            Some(value) => value.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: keys::INTERVAL,
                value: value.clone(),
                reason: format!("{e}"),
            })?,
            None => DEFAULT_AUTO_UPDATE_INTERVAL_MINUTES,
        };

        let clean = match optional(&resolved, keys::CLEAN) {
            Some(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                name: keys::CLEAN,
                value: value.clone(),
                reason: "expected true or false".to_string(),
            })?,
            None => false,
        };

        let application_settings_path = paths::settings_path(&application_root);

        Ok(Self {
            package,
            application,
            feed_config_path: optional(&resolved, keys::NUGET).map(PathBuf::from),
            show_launcher,
            application_root,
            launch_command: optional(&resolved, keys::CMD),
            auto_update_interval_minutes,
            clean,
            working_dir: optional(&resolved, keys::WORKINGDIR).map(PathBuf::from),
            arguments: optional(&resolved, keys::ARGS),
            feed_url: optional(&resolved, keys::FEEDURL),
            feed_username: optional(&resolved, keys::FEEDUSER),
            feed_password: optional(&resolved, keys::FEEDPASSWORD),
            export_path: optional(&resolved, keys::EXPORTPATH).map(PathBuf::from),
            launch_arguments,
            resolved,
            default_settings_path: None,
            application_settings_path,
        })
    }

    /// The merged map with secrets masked, for logging.
    pub fn redacted(&self) -> ConfigMap {
        self.resolved
            .iter()
            .map(|(key, value)| {
                let shown = if key == keys::FEEDPASSWORD {
                    "********".to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect()
    }

    pub fn log_path(&self) -> PathBuf {
        paths::log_path(&self.application_root)
    }

    /// Write the launch arguments to `<export path>/appsettings.json`.
    ///
    /// Returns the written file, or `None` when no export path is configured.
    pub fn export(&self) -> Result<Option<PathBuf>, ConfigError> {
        let Some(export_dir) = &self.export_path else {
            return Ok(None);
        };
        let target = paths::settings_path(export_dir);
        tracing::info!(
            export_path = %export_dir.display(),
            file = %target.display(),
            "exporting launcher configuration",
        );

        if !export_dir.exists() {
            tracing::debug!(export_path = %export_dir.display(), "creating export directory");
            fs::create_dir_all(export_dir).map_err(|source| ConfigError::Io {
                path: export_dir.clone(),
                source,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.launch_arguments)?;
        fs::write(&target, json).map_err(|source| ConfigError::Io {
            path: target.clone(),
            source,
        })?;
        tracing::info!("export complete");
        Ok(Some(target))
    }
}

/// Package, application and application root from a merged map.
fn identity(map: &ConfigMap) -> Result<(PackageId, ApplicationName, PathBuf), ConfigError> {
    let package = optional(map, keys::PACKAGE).ok_or(ConfigError::MissingParameter {
        name: keys::PACKAGE,
    })?;
    let application = optional(map, keys::APP).unwrap_or_else(|| package.clone());
    let explicit_root = optional(map, keys::APPROOT).map(PathBuf::from);
    let root = paths::application_root(explicit_root.as_deref(), &application)?;
    Ok((PackageId(package), ApplicationName(application), root))
}

/// Values that are absent or whitespace-only count as unset.
fn optional(map: &ConfigMap, key: &str) -> Option<String> {
    map.get(key)
        .filter(|value| !value.trim().is_empty())
        .cloned()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn normalize(map: &ConfigMap) -> ConfigMap {
    map.iter()
        .map(|(key, value)| (key.trim_start_matches('-').to_ascii_lowercase(), value.clone()))
        .collect()
}

/// Load a JSON settings file as a flat map. A missing file is an empty layer.
///
/// Nested objects flatten to `parent:child` keys; `null` entries are skipped.
pub fn load_settings_file(path: &Path) -> Result<ConfigMap, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ConfigMap::new()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let value: Value = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Object(object) = value else {
        return Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        });
    };

    let mut map = ConfigMap::new();
    for (key, value) in object {
        flatten_into(&mut map, key.to_ascii_lowercase(), value);
    }
    Ok(map)
}

fn flatten_into(map: &mut ConfigMap, key: String, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            map.insert(key, s);
        }
        Value::Bool(b) => {
            map.insert(key, b.to_string());
        }
        Value::Number(n) => {
            map.insert(key, n.to_string());
        }
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                flatten_into(map, format!("{key}:{index}"), item);
            }
        }
        Value::Object(object) => {
            for (child, item) in object {
                flatten_into(map, format!("{key}:{}", child.to_ascii_lowercase()), item);
            }
        }
    }
}
