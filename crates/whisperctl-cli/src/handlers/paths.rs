//! `paths`: print every resolved path in `key = value` form.

use anyhow::Result;
use whisperctl_core::{JsonConfigStore, SettingsError, data_root, logs_dir};

use crate::error::CliError;

/// Execute the paths command.
pub fn execute(store: &JsonConfigStore) -> Result<()> {
    let root = data_root().map_err(|e| CliError::from(SettingsError::from(e)))?;
    let logs = logs_dir().map_err(|e| CliError::from(SettingsError::from(e)))?;

    println!("data_root = {}", root.display());
    println!("config_file = {}", store.path().display());
    println!("logs_dir = {}", logs.display());
    Ok(())
}
