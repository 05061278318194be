//! Domain types shared by every launchkit crate.
//!
//! The feed identifier ([`PackageId`]) and the storage identifier
//! ([`ApplicationName`]) are kept as separate newtypes: they usually hold the
//! same string but address different things.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of the package on the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(pub String);

impl PackageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Feed ids compare case-insensitively.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.eq_ignore_ascii_case(candidate)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of the installed application; names its application root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationName(pub String);

impl ApplicationName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ApplicationName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ApplicationName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// When the launcher's own status display is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShowLauncher {
    #[default]
    Always,
    FirstLaunch,
    Never,
}

impl fmt::Display for ShowLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowLauncher::Always => write!(f, "Always"),
            ShowLauncher::FirstLaunch => write!(f, "FirstLaunch"),
            ShowLauncher::Never => write!(f, "Never"),
        }
    }
}

impl FromStr for ShowLauncher {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "firstlaunch" => Ok(Self::FirstLaunch),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "unknown launcher display mode '{other}'; expected: Always, FirstLaunch, Never"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Every persisted current/pending value of one application root.
///
/// Absent files are reported as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionState {
    pub current_version: Option<String>,
    pub current_executable: Option<String>,
    pub current_root: Option<String>,
    pub pending_version: Option<String>,
    pub pending_executable: Option<String>,
    pub pending_root: Option<String>,
}

impl VersionState {
    pub fn has_pending(&self) -> bool {
        self.pending_version.is_some()
            || self.pending_executable.is_some()
            || self.pending_root.is_some()
    }
}
