//! # launchkit-staging
//!
//! The staging protocol: find and download new versions into the pending
//! slots ([`PackageManager`]), then promote them to current ([`commit`]).

pub mod commit;
pub mod error;
pub mod package_manager;

pub use commit::{commit, commit_pending, refresh_launch_command, CommitOutcome};
pub use error::StagingError;
pub use package_manager::{select_launch_target, LaunchTarget, PackageManager, ScanResult};
