//! CLI-specific error types and exit codes.

use thiserror::Error;
use whisperctl_core::{ControlError, ControlErrorKind, SettingsError};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Worker control failed.
    #[error("{0}")]
    Control(#[from] ControlError),

    /// Settings could not be loaded, validated or saved.
    #[error("Configuration error: {0}")]
    Settings(#[from] SettingsError),

    /// The worker terminated on its own while `run` was attached.
    #[error("Worker exited unexpectedly (exit code {code:?})")]
    WorkerExited { code: Option<i32> },

    /// IO error (terminal, signal handler).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map error to an exit code following sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Control(ControlError::Cancelled) => 130,
            Self::Control(err) => match err.kind() {
                ControlErrorKind::Configuration => 78, // EX_CONFIG
                ControlErrorKind::State => 69,         // EX_UNAVAILABLE
                ControlErrorKind::Runtime => 71,       // EX_OSERR
                ControlErrorKind::Download => 1,
            },
            Self::Settings(_) => 78,
            Self::WorkerExited { .. } => 1,
            Self::Io(_) => 74, // EX_IOERR
        }
    }

    /// One-line hint for the user, when there is one.
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::Control(err) => Some(err.remediation()),
            Self::Settings(_) => {
                Some("Fix the value or run `whisperctl config show` to inspect settings.")
            }
            Self::WorkerExited { .. } => Some("Inspect the worker output above for the cause."),
            Self::Io(_) => None,
        }
    }

    /// Extra context lines (e.g. captured stderr) to print after the message.
    pub fn context_lines(&self) -> &[String] {
        match self {
            Self::Control(err) => err.context_lines(),
            _ => &[],
        }
    }
}
