//! `download`: fetch a model through the worker's interpreter.

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;
use whisperctl_core::{OutputSink, StreamTag, SupervisorEvent, is_known_model};
use whisperctl_runtime::{CancellationToken, ProcessSupervisor};

use crate::error::CliError;
use crate::presentation::format_line;

/// Execute the download command. Ctrl-C cancels the download.
pub async fn execute(supervisor: &ProcessSupervisor, model: &str) -> Result<()> {
    if !is_known_model(model) {
        warn!(%model, "Not a known model name, trying anyway");
    }

    let progress: Arc<dyn OutputSink> = Arc::new(|event: SupervisorEvent| {
        if let Some(line) = event.as_output() {
            match line.stream {
                StreamTag::Out => println!("{}", format_line(line)),
                StreamTag::Err => eprintln!("{}", format_line(line)),
            }
        }
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    println!("Downloading model '{model}'...");
    let result = supervisor.download_model(model, progress, cancel).await;
    watcher.abort();

    result.map_err(CliError::from)?;
    Ok(())
}
