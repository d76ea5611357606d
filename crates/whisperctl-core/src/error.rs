//! Typed error taxonomy for worker control.
//!
//! Every variant carries a one-line, locale-independent remediation hint
//! (see [`ControlError::remediation`]) suitable for direct display by a
//! front end.

use std::path::PathBuf;
use thiserror::Error;

/// Launch precondition failures detected before anything is spawned.
///
/// These are always recoverable by correcting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No worker script path has been configured.
    #[error("Worker script path is not configured")]
    ScriptNotConfigured,

    /// The configured script does not exist.
    #[error("Worker script not found: {}", path.display())]
    ScriptNotFound { path: PathBuf },

    /// The configured script has the wrong extension.
    #[error("Worker script {} is not a .{expected} file", path.display())]
    ScriptWrongType { path: PathBuf, expected: String },

    /// The interpreter could not be found (on disk or on `PATH`).
    #[error("Interpreter not found: {}", path.display())]
    InterpreterNotFound { path: PathBuf },

    /// The interpreter exists but cannot be executed.
    #[error("Interpreter is not executable: {}", path.display())]
    InterpreterNotExecutable { path: PathBuf },

    /// The interpreter's version query failed or produced no version.
    #[error("Could not determine interpreter version for {}: {detail}", path.display())]
    InterpreterVersionUnparseable { path: PathBuf, detail: String },

    /// The interpreter is older than the minimum supported runtime.
    #[error(
        "Interpreter version {}.{} is too old (requires {}.{} or newer)",
        found.0, found.1, required.0, required.1
    )]
    InterpreterVersionTooLow {
        found: (u32, u32),
        required: (u32, u32),
    },
}

impl ValidationError {
    /// One-line hint telling the user how to fix the problem.
    pub const fn remediation(&self) -> &'static str {
        match self {
            Self::ScriptNotConfigured => "Set a valid worker script path in the settings.",
            Self::ScriptNotFound { .. } => {
                "Check the worker script path; the file must exist on disk."
            }
            Self::ScriptWrongType { .. } => {
                "Point the script path at the worker's Python (.py) entry file."
            }
            Self::InterpreterNotFound { .. } => {
                "Set the interpreter path to an installed Python executable."
            }
            Self::InterpreterNotExecutable { .. } => {
                "Make the interpreter executable (chmod +x) or choose another one."
            }
            Self::InterpreterVersionUnparseable { .. } => {
                "Verify the interpreter runs and prints its version with --version."
            }
            Self::InterpreterVersionTooLow { .. } => {
                "Install a newer Python and update the interpreter path."
            }
        }
    }
}

/// Coarse category of a [`ControlError`], for callers that branch on policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlErrorKind {
    /// Bad configuration, detected before spawning.
    Configuration,
    /// Caller misuse (already running / not running).
    State,
    /// OS-level failure while spawning or terminating.
    Runtime,
    /// A model download failed or was cancelled.
    Download,
}

/// Errors returned by every public controller operation.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Launch preconditions failed; nothing was spawned.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The model name is empty or contains unsupported characters.
    #[error("Invalid model name '{0}'")]
    InvalidModel(String),

    /// A managed process is already alive.
    #[error("Worker is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// No managed process is alive.
    #[error("Worker is not running")]
    NotRunning,

    /// The OS refused to spawn the process.
    #[error("Failed to spawn worker: {reason}")]
    SpawnFailed { reason: String },

    /// The process died before the startup grace period elapsed.
    #[error("Worker exited during startup (exit code {code:?})")]
    EarlyExit { code: Option<i32> },

    /// The process is still observably alive after a forced kill.
    #[error("Failed to kill worker (pid {pid}): {reason}")]
    KillFailed { pid: u32, reason: String },

    /// The download subprocess exited unsuccessfully.
    #[error("Download of model '{model}' failed (exit code {code:?})")]
    DownloadFailed {
        model: String,
        code: Option<i32>,
        stderr_tail: Vec<String>,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ControlError {
    /// Category of this error.
    pub const fn kind(&self) -> ControlErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidModel(_) => ControlErrorKind::Configuration,
            Self::AlreadyRunning { .. } | Self::NotRunning => ControlErrorKind::State,
            Self::SpawnFailed { .. } | Self::EarlyExit { .. } | Self::KillFailed { .. } => {
                ControlErrorKind::Runtime
            }
            Self::DownloadFailed { .. } | Self::Cancelled => ControlErrorKind::Download,
        }
    }

    /// One-line hint telling the user how to recover.
    pub const fn remediation(&self) -> &'static str {
        match self {
            Self::Validation(inner) => inner.remediation(),
            Self::InvalidModel(_) => {
                "Use a model name made of letters, digits, '.', '-' or '_' (e.g. base)."
            }
            Self::AlreadyRunning { .. } => "Stop the running worker first, or use restart.",
            Self::NotRunning => "Start the worker before stopping it.",
            Self::SpawnFailed { .. } => {
                "Check that the interpreter can be launched and the script is readable."
            }
            Self::EarlyExit { .. } => "Inspect the worker's stderr output for the crash reason.",
            Self::KillFailed { .. } => {
                "The worker may still be running; terminate it manually and check permissions."
            }
            Self::DownloadFailed { .. } => {
                "Check network access and that the transcription package is installed."
            }
            Self::Cancelled => "Run the operation again if it was cancelled by mistake.",
        }
    }

    /// Lines of stderr captured as context, if any.
    pub fn context_lines(&self) -> &[String] {
        match self {
            Self::DownloadFailed { stderr_tail, .. } => stderr_tail,
            _ => &[],
        }
    }
}
