//! `launchkit --print-state`: dump the persisted version state.

use anyhow::{Context, Result};

use launchkit_core::{LauncherConfig, StorageService};

pub fn print(config: &LauncherConfig) -> Result<()> {
    let storage = StorageService::new(&config.application_root);
    let state = storage
        .state_snapshot()
        .with_context(|| format!("failed to read state under {}", config.application_root.display()))?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}
