//! One-shot model downloads in a short-lived subprocess.
//!
//! The download reuses the worker's spawn and pump primitives but never
//! touches the supervisor's managed process. Both pipes stream to the
//! caller's progress sink, followed by a completion line on success; the
//! tail of stderr is kept as error context.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whisperctl_core::{ControlError, OutputSink, StreamTag, SupervisorEvent, validate_model_name};

use crate::process::{
    ProcessPlatform, SpawnSpec, default_platform, join_pumps, spawn_stream_pump,
};
use crate::validate::PathValidator;

/// Placeholder replaced by the model name when it is a whole argument.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Number of stderr lines kept for [`ControlError::DownloadFailed`].
pub const STDERR_TAIL_LINES: usize = 20;

const DEFAULT_SNIPPET: &str = "import sys, whisper; whisper.load_model(sys.argv[1])";

/// Program and argument template for a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCommand {
    /// Program to run; `None` means the configured (validated) interpreter.
    pub program: Option<PathBuf>,
    /// Arguments; any argument equal to `{model}` becomes the model name.
    pub args: Vec<String>,
}

impl Default for DownloadCommand {
    fn default() -> Self {
        Self {
            program: None,
            args: vec![
                "-c".to_string(),
                DEFAULT_SNIPPET.to_string(),
                MODEL_PLACEHOLDER.to_string(),
            ],
        }
    }
}

impl DownloadCommand {
    /// A fully custom command.
    pub fn custom(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: Some(program.into()),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments with the placeholder substituted.
    pub fn render_args(&self, model: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                if arg == MODEL_PLACEHOLDER {
                    model.to_string()
                } else {
                    arg.clone()
                }
            })
            .collect()
    }
}

/// Runs a download command and reports success by exit code.
pub struct ModelDownloader {
    interpreter: String,
    command: DownloadCommand,
    validator: PathValidator,
    platform: Arc<dyn ProcessPlatform>,
    stop_grace: Duration,
    kill_grace: Duration,
    pump_join_timeout: Duration,
}

impl std::fmt::Debug for ModelDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDownloader")
            .field("interpreter", &self.interpreter)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl ModelDownloader {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            command: DownloadCommand::default(),
            validator: PathValidator::default(),
            platform: default_platform(),
            stop_grace: Duration::from_secs(5),
            kill_grace: Duration::from_secs(2),
            pump_join_timeout: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub fn with_command(mut self, command: DownloadCommand) -> Self {
        self.command = command;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: PathValidator) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Arc<dyn ProcessPlatform>) -> Self {
        self.platform = platform;
        self
    }

    /// Grace periods used when a download is cancelled.
    #[must_use]
    pub const fn with_timings(mut self, stop_grace: Duration, kill_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self.kill_grace = kill_grace;
        self
    }

    #[must_use]
    pub const fn with_pump_join_timeout(mut self, limit: Duration) -> Self {
        self.pump_join_timeout = limit;
        self
    }

    /// Download `model`, streaming output to `progress`.
    ///
    /// Returns `Cancelled` if `cancel` fires first; the subprocess is then
    /// stopped gracefully and force-killed if it lingers.
    pub async fn download(
        &self,
        model: &str,
        progress: Arc<dyn OutputSink>,
        cancel: CancellationToken,
    ) -> Result<(), ControlError> {
        if !validate_model_name(model) {
            return Err(ControlError::InvalidModel(model.to_string()));
        }

        let program = match &self.command.program {
            Some(program) => program.clone(),
            None => self.validator.validate_interpreter(&self.interpreter).await?.0,
        };

        let mut spec = SpawnSpec::new(&program).env("PYTHONUNBUFFERED", "1");
        for arg in self.command.render_args(model) {
            spec = spec.arg(arg);
        }

        info!(%model, program = %program.display(), "Downloading model");
        let mut child = self
            .platform
            .spawn(&spec)
            .map_err(|e| ControlError::SpawnFailed {
                reason: e.to_string(),
            })?;

        let tail = Arc::new(TailSink::new(progress, STDERR_TAIL_LINES));
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let sink: Arc<dyn OutputSink> = tail.clone();
            pumps.push(spawn_stream_pump(stdout, StreamTag::Out, sink));
        }
        if let Some(stderr) = child.stderr.take() {
            let sink: Arc<dyn OutputSink> = tail.clone();
            pumps.push(spawn_stream_pump(stderr, StreamTag::Err, sink));
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            () = cancel.cancelled() => None,
        };

        let outcome = match waited {
            Some(status) => status,
            None => {
                warn!(%model, "Download cancelled, stopping subprocess");
                self.terminate(&mut child).await;
                join_pumps(&mut pumps, self.pump_join_timeout).await;
                return Err(ControlError::Cancelled);
            }
        };

        for pump in &pumps {
            pump.begin_drain();
        }
        join_pumps(&mut pumps, self.pump_join_timeout).await;

        match outcome {
            Ok(status) if status.success() => {
                info!(%model, "Model download complete");
                tail.emit(SupervisorEvent::output(
                    StreamTag::Out,
                    format!("Model '{model}' downloaded successfully"),
                ));
                Ok(())
            }
            Ok(status) => Err(self.failure(model, status, &tail)),
            Err(e) => {
                debug!(%model, error = %e, "Waiting on download process failed");
                Err(ControlError::DownloadFailed {
                    model: model.to_string(),
                    code: None,
                    stderr_tail: tail.lines(),
                })
            }
        }
    }

    fn failure(&self, model: &str, status: ExitStatus, tail: &TailSink) -> ControlError {
        warn!(%model, %status, interpreter = %self.interpreter, "Model download failed");
        ControlError::DownloadFailed {
            model: model.to_string(),
            code: status.code(),
            stderr_tail: tail.lines(),
        }
    }

    async fn terminate(&self, child: &mut Child) {
        if let Some(pid) = child.id() {
            match self.platform.request_graceful_stop(pid).await {
                Ok(()) => {
                    if timeout(self.stop_grace, child.wait()).await.is_ok() {
                        return;
                    }
                }
                Err(e) => debug!(pid, error = %e, "Graceful stop of download failed"),
            }
        }

        if let Err(e) = self.platform.force_kill(child) {
            debug!(error = %e, "Force kill of download failed");
        }
        if timeout(self.kill_grace, child.wait()).await.is_err() {
            warn!("Download process still alive after forced kill");
        }
    }
}

/// Forwards every event and remembers the last stderr lines.
struct TailSink {
    inner: Arc<dyn OutputSink>,
    capacity: usize,
    lines: Mutex<VecDeque<String>>,
}

impl TailSink {
    fn new(inner: Arc<dyn OutputSink>, capacity: usize) -> Self {
        Self {
            inner,
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl OutputSink for TailSink {
    fn emit(&self, event: SupervisorEvent) {
        if let Some(line) = event.as_output()
            && line.stream == StreamTag::Err
        {
            let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
            if lines.len() == self.capacity {
                lines.pop_front();
            }
            lines.push_back(line.text.clone());
        }
        self.inner.emit(event);
    }
}
