//! `run`: start the worker and stay attached until Ctrl-C or worker exit.

use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, interval};
use tracing::debug;
use whisperctl_core::{ConfigStore, OutputSink, StreamTag, SupervisorEvent};
use whisperctl_runtime::TracingSink;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{describe_event, format_line, format_status};

/// How often the worker's liveness is checked while attached.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments for the run command.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub model: Option<String>,
    /// Status line period; zero disables status lines.
    pub status_interval: Duration,
    /// Mirror worker output into the log file.
    pub log_output: bool,
}

/// Execute the run command.
pub async fn execute(ctx: CliContext, args: RunArgs) -> Result<()> {
    let CliContext {
        store,
        supervisor,
        mut events,
    } = ctx;
    let model = args.model.unwrap_or_else(|| store.selected_model());
    let stop_timeout = supervisor.config().stop_timeout;
    let printer = Printer {
        mirror: args.log_output,
    };

    supervisor.start(&model).await.map_err(CliError::from)?;
    println!("Press Ctrl-C to stop the worker.");

    let mut liveness = interval(LIVENESS_INTERVAL);
    let mut last_status = Instant::now();
    let exit_code = loop {
        tokio::select! {
            Some(event) = events.recv() => printer.show(event),
            _ = liveness.tick() => {
                let status = supervisor.status().await;
                if !status.is_running {
                    // Reaping queued an Exited event; show it before leaving
                    let mut code = None;
                    while let Ok(event) = events.try_recv() {
                        if let SupervisorEvent::Exited { code: exit, .. } = event {
                            code = exit;
                        }
                        printer.show(event);
                    }
                    break Some(code);
                }
                if !args.status_interval.is_zero() && last_status.elapsed() >= args.status_interval {
                    println!("{}", format_status(&status));
                    last_status = Instant::now();
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(CliError::from)?;
                debug!("Ctrl-C received, stopping worker");
                println!("Stopping worker...");
                supervisor.stop(stop_timeout).await.map_err(CliError::from)?;
                while let Ok(event) = events.try_recv() {
                    printer.show(event);
                }
                break None;
            }
        }
    };

    match exit_code {
        Some(code) if code != Some(0) => Err(CliError::WorkerExited { code }.into()),
        _ => Ok(()),
    }
}

struct Printer {
    mirror: bool,
}

impl Printer {
    fn show(&self, event: SupervisorEvent) {
        match &event {
            SupervisorEvent::Output(line) => match line.stream {
                StreamTag::Out => println!("{}", format_line(line)),
                StreamTag::Err => eprintln!("{}", format_line(line)),
            },
            other => {
                if let Some(text) = describe_event(other) {
                    println!("{text}");
                }
            }
        }
        if self.mirror {
            TracingSink.emit(event);
        }
    }
}
