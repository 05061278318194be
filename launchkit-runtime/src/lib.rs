//! Launch-cycle runtime: orchestrator, process supervisor, readiness probing
//! and the background auto updater.

pub mod auto_updater;
mod error;
pub mod launcher;
pub mod log_rotation;
pub mod logging;
pub mod readiness;
pub mod status;
pub mod supervisor;

pub use auto_updater::AutoUpdater;
pub use error::LauncherError;
pub use launcher::{Initialized, LaunchReport, Launcher};
pub use readiness::{default_probe, MainWindow, ReadinessPolicy, ReadinessProbe};
pub use status::{LifecycleEvent, NoopStatus, StatusSink, StatusUpdate};
pub use supervisor::Supervisor;
