//! `launchkit <package>`: resolve configuration, update and launch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use launchkit_core::config::keys;
use launchkit_core::{paths, ConfigMap, LauncherConfig, ShowLauncher};
use launchkit_runtime::logging::init_file_tracing;
use launchkit_runtime::{LaunchReport, Launcher, NoopStatus, StatusSink, StatusUpdate};

use crate::commands::{export, state};
use crate::console::ConsoleStatus;

/// Launcher settings. Every flag can also come from an `appsettings.json`.
#[derive(Args, Debug, Default)]
pub struct LaunchArgs {
    /// Package identifier on the feed.
    #[arg(value_name = "PACKAGE")]
    pub package_positional: Option<String>,

    /// Package identifier on the feed (overrides the positional form).
    #[arg(long)]
    pub package: Option<String>,

    /// Application name used for the storage folder. Defaults to the package.
    #[arg(long)]
    pub app: Option<String>,

    /// Feed configuration file listing package sources.
    #[arg(long)]
    pub nuget: Option<String>,

    /// When to show launcher status: Always, FirstLaunch or Never.
    #[arg(long)]
    pub gui: Option<String>,

    /// Application root folder.
    #[arg(long)]
    pub approot: Option<String>,

    /// Launch command relative to the version folder; replaces executable detection.
    #[arg(long)]
    pub cmd: Option<String>,

    /// Minutes between background update checks; 0 or less disables them.
    #[arg(long, allow_hyphen_values = true)]
    pub interval: Option<String>,

    /// Delete all local state before launching.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub clean: Option<String>,

    /// Working directory of the launched application.
    #[arg(long)]
    pub workingdir: Option<String>,

    /// Arguments passed to the launched application.
    #[arg(long, allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Feed URL, or a folder of packages.
    #[arg(long)]
    pub feedurl: Option<String>,

    /// Feed user name.
    #[arg(long)]
    pub feeduser: Option<String>,

    /// Feed password.
    #[arg(long)]
    pub feedpassword: Option<String>,

    /// Write the given settings to `<dir>/appsettings.json` and exit.
    #[arg(long)]
    pub exportpath: Option<String>,

    /// Print the persisted version state as JSON and exit.
    #[arg(long)]
    pub print_state: bool,
}

impl LaunchArgs {
    pub fn run(self) -> Result<ExitCode> {
        let print_state = self.print_state;
        let launch_arguments = self.into_config_map();
        let config = LauncherConfig::resolve(default_settings_path().as_deref(), launch_arguments)
            .context("failed to resolve launcher configuration")?;

        if print_state {
            state::print(&config)?;
            return Ok(ExitCode::SUCCESS);
        }

        let log_path = config.log_path();
        let _guard = init_file_tracing(&log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;
        tracing::info!(
            package = %config.package,
            application = %config.application,
            root = %config.application_root.display(),
            "launcher starting",
        );
        tracing::debug!(settings = ?config.redacted(), "resolved configuration");

        let status = status_sink(&config);

        if config.export_path.is_some() {
            return Ok(export::run(&config, status.as_ref()));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let report = runtime.block_on(launch(config, status));

        Ok(match report {
            LaunchReport::Exited { code } => {
                tracing::info!(code = ?code, "launcher finished");
                ExitCode::SUCCESS
            }
            LaunchReport::Crashed { message } => {
                tracing::error!(error = %message, "launcher finished after a failure");
                ExitCode::FAILURE
            }
        })
    }

    /// Only the values actually given, keyed like the settings file.
    fn into_config_map(self) -> ConfigMap {
        let package = self.package.or(self.package_positional);
        let pairs = [
            (keys::PACKAGE, package),
            (keys::APP, self.app),
            (keys::NUGET, self.nuget),
            (keys::GUI, self.gui),
            (keys::APPROOT, self.approot),
            (keys::CMD, self.cmd),
            (keys::INTERVAL, self.interval),
            (keys::CLEAN, self.clean),
            (keys::WORKINGDIR, self.workingdir),
            (keys::ARGS, self.args),
            (keys::FEEDURL, self.feedurl),
            (keys::FEEDUSER, self.feeduser),
            (keys::FEEDPASSWORD, self.feedpassword),
            (keys::EXPORTPATH, self.exportpath),
        ];
        pairs
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect()
    }
}

async fn launch(config: LauncherConfig, status: Arc<dyn StatusSink>) -> LaunchReport {
    match Launcher::from_config(config, status.clone()) {
        Ok(launcher) => launcher.launch().await,
        Err(err) => {
            tracing::error!(error = %err, "failed to set up launcher");
            status.update(StatusUpdate::crashed(launchkit_runtime::launcher::CRASH_TEXT));
            LaunchReport::Crashed {
                message: err.to_string(),
            }
        }
    }
}

fn status_sink(config: &LauncherConfig) -> Arc<dyn StatusSink> {
    match config.show_launcher {
        ShowLauncher::Never => Arc::new(NoopStatus),
        mode => Arc::new(ConsoleStatus::new(mode, config.log_path())),
    }
}

/// `appsettings.json` next to the launcher binary.
fn default_settings_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(paths::settings_path(exe.parent()?))
}
