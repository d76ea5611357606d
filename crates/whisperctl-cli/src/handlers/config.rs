//! `config`: show or change persisted settings.

use anyhow::Result;
use whisperctl_core::{JsonConfigStore, SettingsUpdate};

use crate::commands::ConfigCommand;
use crate::error::CliError;

/// Execute a config subcommand.
pub fn execute(store: &JsonConfigStore, command: ConfigCommand) -> Result<()> {
    let (update, label, value) = match command {
        ConfigCommand::Show => {
            let settings = store.snapshot();
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        ConfigCommand::SetInterpreter { path } => (
            SettingsUpdate {
                interpreter_path: Some(Some(path.clone())),
                ..Default::default()
            },
            "Interpreter",
            path,
        ),
        ConfigCommand::SetScript { path } => (
            SettingsUpdate {
                script_path: Some(Some(path.clone())),
                ..Default::default()
            },
            "Worker script",
            path,
        ),
        ConfigCommand::SetModel { model } => (
            SettingsUpdate {
                selected_model: Some(Some(model.clone())),
                ..Default::default()
            },
            "Default model",
            model,
        ),
    };

    store.update(&update).map_err(CliError::from)?;
    store.save().map_err(CliError::from)?;
    println!("{label} set to {value}");
    Ok(())
}
