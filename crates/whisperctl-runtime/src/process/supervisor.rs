//! Single-worker process supervisor.
//!
//! # Locking
//!
//! `slot` (async mutex) owns the child handle and is held for the whole of
//! `start`, `stop` and `restart`, so those never interleave. `status` and
//! `is_running` never wait on it: they read the `active` summary and only
//! touch the slot through `try_lock` to reap a worker that exited on its own.
//!
//! # Identity
//!
//! The child handle is authoritative until the child is reaped. Liveness
//! reported to callers additionally compares the pid's start time against
//! the one recorded at spawn, so a reused pid is never reported as ours.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Child;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use whisperctl_core::{
    ConfigStore, ControlError, OutputSink, StatusSnapshot, StreamTag, SupervisorEvent,
    WorkerControl, validate_model_name,
};

use super::platform::{ProcessPlatform, SpawnSpec, default_platform};
use super::probe::{Liveness, ProcessIdentity, ProcessProbe};
use super::pump::{JoinOutcome, PumpHandle, join_pumps, spawn_stream_pump};
use crate::download::{DownloadCommand, ModelDownloader};
use crate::validate::PathValidator;

/// Timing and environment knobs for [`ProcessSupervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Graceful stop budget used by `restart`.
    pub stop_timeout: Duration,
    /// How often `stop` polls for exit.
    pub poll_interval: Duration,
    /// Bound on each pump join after the worker exits.
    pub pump_join_timeout: Duration,
    /// How long to wait for the OS after a forced kill.
    pub kill_grace: Duration,
    /// If set, `start` waits this long and fails with `EarlyExit` when the
    /// worker already died.
    pub startup_grace: Option<Duration>,
    /// Environment that turns off the worker's output buffering.
    pub unbuffered_env: Vec<(String, String)>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
            pump_join_timeout: Duration::from_secs(2),
            kill_grace: Duration::from_secs(2),
            startup_grace: None,
            unbuffered_env: vec![("PYTHONUNBUFFERED".to_string(), "1".to_string())],
        }
    }
}

struct ManagedProcess {
    child: Child,
    info: ActiveInfo,
    pumps: Vec<PumpHandle>,
}

#[derive(Debug, Clone)]
struct ActiveInfo {
    identity: ProcessIdentity,
    model: String,
    started_at: DateTime<Utc>,
}

/// Owns at most one worker process and its two output pumps.
pub struct ProcessSupervisor {
    config_store: Arc<dyn ConfigStore>,
    sink: Arc<dyn OutputSink>,
    platform: Arc<dyn ProcessPlatform>,
    validator: PathValidator,
    download_command: DownloadCommand,
    probe: ProcessProbe,
    config: SupervisorConfig,
    slot: AsyncMutex<Option<ManagedProcess>>,
    active: RwLock<Option<ActiveInfo>>,
    last_error: Mutex<Option<String>>,
    usage_warned: AtomicBool,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("config", &self.config)
            .field("active", &self.active_info())
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Create a supervisor reading paths from `config_store` and emitting to
    /// `sink`, using the current OS platform and default settings.
    pub fn new(config_store: Arc<dyn ConfigStore>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            config_store,
            sink,
            platform: default_platform(),
            validator: PathValidator::default(),
            download_command: DownloadCommand::default(),
            probe: ProcessProbe::new(),
            config: SupervisorConfig::default(),
            slot: AsyncMutex::new(None),
            active: RwLock::new(None),
            last_error: Mutex::new(None),
            usage_warned: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Arc<dyn ProcessPlatform>) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: PathValidator) -> Self {
        self.validator = validator;
        self
    }

    #[must_use]
    pub fn with_download_command(mut self, command: DownloadCommand) -> Self {
        self.download_command = command;
        self
    }

    pub const fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Validate configuration and spawn the worker with `model`.
    pub async fn start(&self, model: &str) -> Result<(), ControlError> {
        let mut slot = self.slot.lock().await;
        let result = self.start_locked(&mut slot, model).await;
        self.record_outcome(&result, true);
        result
    }

    /// Stop the worker, escalating to a forced kill after `timeout`.
    pub async fn stop(&self, timeout: Duration) -> Result<(), ControlError> {
        let mut slot = self.slot.lock().await;
        let result = self.stop_locked(&mut slot, timeout).await;
        self.record_outcome(&result, false);
        result
    }

    /// Stop (tolerating `NotRunning`), then start with `model`.
    ///
    /// The control lock is held across both halves so no other start can
    /// slip in between.
    pub async fn restart(&self, model: &str) -> Result<(), ControlError> {
        let mut slot = self.slot.lock().await;
        let result = match self.stop_locked(&mut slot, self.config.stop_timeout).await {
            Ok(()) | Err(ControlError::NotRunning) => self.start_locked(&mut slot, model).await,
            Err(e) => Err(e),
        };
        self.record_outcome(&result, true);
        result
    }

    /// Whether the worker is alive and still the process we spawned.
    pub async fn is_running(&self) -> bool {
        self.try_reap().await;
        self.active_info()
            .is_some_and(|info| self.probe.liveness(&info.identity).is_alive())
    }

    /// Fresh snapshot from OS queries.
    pub async fn status(&self) -> StatusSnapshot {
        self.try_reap().await;
        let last_error = self.last_error();

        let Some(info) = self.active_info() else {
            return StatusSnapshot::stopped(last_error);
        };

        let observation = self.probe.observe(&info.identity);
        if !observation.liveness.is_alive() {
            debug!(pid = info.identity.pid, liveness = ?observation.liveness, "Worker not alive");
            return StatusSnapshot::stopped(last_error);
        }

        if observation.usage.is_none() && !self.usage_warned.swap(true, Ordering::Relaxed) {
            warn!(pid = info.identity.pid, "Resource usage unavailable for worker");
        }

        StatusSnapshot {
            is_running: true,
            pid: Some(info.identity.pid),
            model: Some(info.model),
            started_at: Some(info.started_at),
            memory_bytes: observation.usage.map(|u| u.memory_bytes),
            cpu_percent: observation.usage.map(|u| u.cpu_percent),
            last_error,
        }
    }

    /// Message of the most recent failed operation.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Download `model` in a separate short-lived process.
    ///
    /// Output goes to `progress`, not to the supervisor's sink. The managed
    /// worker is untouched.
    pub async fn download_model(
        &self,
        model: &str,
        progress: Arc<dyn OutputSink>,
        cancel: CancellationToken,
    ) -> Result<(), ControlError> {
        let downloader = ModelDownloader::new(self.config_store.interpreter_path())
            .with_command(self.download_command.clone())
            .with_validator(self.validator.clone())
            .with_platform(Arc::clone(&self.platform))
            .with_timings(self.config.stop_timeout, self.config.kill_grace)
            .with_pump_join_timeout(self.config.pump_join_timeout);

        let result = downloader.download(model, progress, cancel).await;
        self.record_outcome(&result, false);
        result
    }

    async fn start_locked(
        &self,
        slot: &mut Option<ManagedProcess>,
        model: &str,
    ) -> Result<(), ControlError> {
        self.reap_exited(slot).await;
        if let Some(managed) = slot.as_ref() {
            return Err(ControlError::AlreadyRunning {
                pid: managed.info.identity.pid,
            });
        }

        if !validate_model_name(model) {
            return Err(ControlError::InvalidModel(model.to_string()));
        }

        // Read at call time; paths may change between restarts
        let interpreter = self.config_store.interpreter_path();
        let script = self.config_store.script_path();
        let paths = self.validator.validate(&interpreter, &script).await?;

        let mut spec = SpawnSpec::new(&paths.interpreter)
            .arg(paths.script.to_string_lossy())
            .arg(model);
        for (key, value) in &self.config.unbuffered_env {
            spec = spec.env(key, value);
        }
        if let Some(dir) = paths.script.parent() {
            spec = spec.current_dir(dir);
        }

        debug!(interpreter = %paths.interpreter.display(), script = %paths.script.display(), %model, "Spawning worker");
        let mut child = self
            .platform
            .spawn(&spec)
            .map_err(|e| ControlError::SpawnFailed {
                reason: e.to_string(),
            })?;

        let Some(pid) = child.id() else {
            return Err(ControlError::SpawnFailed {
                reason: "process exited before its pid could be read".to_string(),
            });
        };

        let identity = self.probe.identify(pid);
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(spawn_stream_pump(stdout, StreamTag::Out, Arc::clone(&self.sink)));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(spawn_stream_pump(stderr, StreamTag::Err, Arc::clone(&self.sink)));
        }

        info!(pid, %model, "process started, pid={pid}");
        self.sink.emit(SupervisorEvent::Started {
            pid,
            model: model.to_string(),
        });

        let mut managed = ManagedProcess {
            child,
            info: ActiveInfo {
                identity,
                model: model.to_string(),
                started_at: Utc::now(),
            },
            pumps,
        };

        if let Some(grace) = self.config.startup_grace.filter(|g| !g.is_zero()) {
            sleep(grace).await;
            if let Ok(Some(status)) = managed.child.try_wait() {
                let code = status.code();
                warn!(pid, ?code, "Worker exited during startup");
                self.finish(&mut managed).await;
                self.sink.emit(SupervisorEvent::Exited { pid, code });
                return Err(ControlError::EarlyExit { code });
            }
        }

        debug_assert!(slot.is_none(), "two managed workers alive at once");
        self.set_active(Some(managed.info.clone()));
        *slot = Some(managed);
        Ok(())
    }

    async fn stop_locked(
        &self,
        slot: &mut Option<ManagedProcess>,
        limit: Duration,
    ) -> Result<(), ControlError> {
        self.reap_exited(slot).await;
        let Some(managed) = slot.as_mut() else {
            return Err(ControlError::NotRunning);
        };
        let pid = managed.info.identity.pid;

        let liveness = self.probe.liveness(&managed.info.identity);
        if matches!(liveness, Liveness::Gone | Liveness::Replaced) {
            // Reaped behind our back; signalling the pid could hit a stranger
            warn!(pid, ?liveness, "Worker vanished without being reaped");
            if let Some(mut managed) = slot.take() {
                self.finish(&mut managed).await;
            }
            self.sink.emit(SupervisorEvent::Exited { pid, code: None });
            return Err(ControlError::NotRunning);
        }

        let exited = match self.platform.request_graceful_stop(pid).await {
            Ok(()) => self.poll_exit(&mut managed.child, limit).await,
            Err(e) => {
                warn!(pid, error = %e, "Graceful stop request failed, escalating");
                None
            }
        };

        let forced = exited.is_none();
        if forced {
            warn!(pid, ?limit, "Worker did not exit in time, forcing kill");
            if let Err(reason) = self.force_kill(&mut managed.child).await {
                error!(pid, %reason, "Failed to kill worker");
                return Err(ControlError::KillFailed { pid, reason });
            }
        }

        if let Some(mut managed) = slot.take() {
            self.finish(&mut managed).await;
        }
        info!(pid, forced, "Worker stopped");
        self.sink.emit(SupervisorEvent::Stopped { pid, forced });
        Ok(())
    }

    /// Poll `try_wait` until the child exits or `limit` elapses.
    async fn poll_exit(&self, child: &mut Child, limit: Duration) -> Option<Option<i32>> {
        let deadline = Instant::now() + limit;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Some(status.code()),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "try_wait failed while polling for exit"),
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    async fn force_kill(&self, child: &mut Child) -> Result<(), String> {
        let kill_error = self.platform.force_kill(child).err();
        match timeout(self.config.kill_grace, child.wait()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(kill_error.map_or_else(
                || format!("still alive {:?} after forced kill", self.config.kill_grace),
                |e| e.to_string(),
            )),
        }
    }

    /// Drain and join the pumps, then forget the worker.
    ///
    /// Both pumps share one `pump_join_timeout`.
    async fn finish(&self, managed: &mut ManagedProcess) {
        for pump in &managed.pumps {
            pump.begin_drain();
        }
        let outcomes = join_pumps(&mut managed.pumps, self.config.pump_join_timeout).await;
        for (pump, outcome) in managed.pumps.iter().zip(outcomes) {
            if outcome == JoinOutcome::Abandoned {
                debug!(pid = managed.info.identity.pid, stream = %pump.stream(), "Output after this point is dropped");
            }
        }
        self.set_active(None);
    }

    /// Reap the worker if it exited on its own, emitting `Exited` once.
    async fn reap_exited(&self, slot: &mut Option<ManagedProcess>) {
        let Some(managed) = slot.as_mut() else {
            return;
        };
        let code = match managed.child.try_wait() {
            Ok(Some(status)) => status.code(),
            Ok(None) => return,
            Err(e) => {
                debug!(error = %e, "try_wait failed");
                return;
            }
        };

        if let Some(mut managed) = slot.take() {
            let pid = managed.info.identity.pid;
            self.finish(&mut managed).await;
            info!(pid, ?code, "Worker exited on its own");
            self.sink.emit(SupervisorEvent::Exited { pid, code });
        }
    }

    /// Reap opportunistically, never waiting behind an in-flight operation.
    async fn try_reap(&self) {
        if let Ok(mut slot) = self.slot.try_lock() {
            self.reap_exited(&mut slot).await;
        }
    }

    fn active_info(&self) -> Option<ActiveInfo> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_active(&self, info: Option<ActiveInfo>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = info;
    }

    fn record_outcome(&self, result: &Result<(), ControlError>, clears: bool) {
        let mut last = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) if clears => *last = None,
            Ok(()) => {}
            Err(e) => *last = Some(e.to_string()),
        }
    }
}

#[async_trait]
impl WorkerControl for ProcessSupervisor {
    async fn start(&self, model: &str) -> Result<(), ControlError> {
        Self::start(self, model).await
    }

    async fn stop(&self, timeout: Duration) -> Result<(), ControlError> {
        Self::stop(self, timeout).await
    }

    async fn restart(&self, model: &str) -> Result<(), ControlError> {
        Self::restart(self, model).await
    }

    async fn is_running(&self) -> bool {
        Self::is_running(self).await
    }

    async fn status(&self) -> StatusSnapshot {
        Self::status(self).await
    }
}
