//! `check`: run the launch preconditions without starting anything.

use anyhow::Result;
use whisperctl_core::{ConfigStore, ControlError};
use whisperctl_runtime::PathValidator;

use crate::error::CliError;

/// Execute the check command against the settings in `store`.
pub async fn execute(store: &dyn ConfigStore) -> Result<()> {
    let interpreter = store.interpreter_path();
    let script = store.script_path();

    println!("Interpreter: {interpreter}");
    println!(
        "Script:      {}",
        if script.is_empty() {
            "(not configured)"
        } else {
            &script
        }
    );

    let paths = PathValidator::default()
        .validate(&interpreter, &script)
        .await
        .map_err(|e| CliError::from(ControlError::from(e)))?;

    println!();
    println!(
        "✓ Python {}.{} at {}",
        paths.version.0,
        paths.version.1,
        paths.interpreter.display()
    );
    println!("✓ Worker script {}", paths.script.display());
    println!("Ready to run model '{}'.", store.selected_model());
    Ok(())
}
