//! Export mode: write the launch arguments to `<exportpath>/appsettings.json`.

use std::process::ExitCode;

use launchkit_core::LauncherConfig;
use launchkit_runtime::{StatusSink, StatusUpdate};

pub fn run(config: &LauncherConfig, status: &dyn StatusSink) -> ExitCode {
    match config.export() {
        Ok(Some(path)) => {
            status.update(
                StatusUpdate::message(format!("Exported launcher settings to {}", path.display()))
                    .manual_close(),
            );
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "export failed");
            status.update(StatusUpdate::crashed("Failed to export launcher settings").manual_close());
            ExitCode::FAILURE
        }
    }
}
