//! CLI bootstrap - the composition root.
//!
//! This is the only place where the settings store, the event channel and
//! the supervisor are wired together. Handlers receive the composed
//! [`CliContext`].

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use whisperctl_core::{JsonConfigStore, SupervisorEvent, config_file_path};
use whisperctl_runtime::{ProcessSupervisor, SupervisorConfig, channel_sink};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Settings file to load.
    pub config_path: PathBuf,
    /// Supervisor timings.
    pub supervisor: SupervisorConfig,
}

impl CliConfig {
    /// Create config with the default settings location.
    pub fn with_defaults() -> Result<Self, CliError> {
        Ok(Self {
            config_path: config_file_path().map_err(whisperctl_core::SettingsError::from)?,
            supervisor: SupervisorConfig::default(),
        })
    }

    /// Override the settings file location.
    #[must_use]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.config_path = path;
        }
        self
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// Persisted settings, read by the supervisor on every start.
    pub store: Arc<JsonConfigStore>,
    /// The worker supervisor.
    pub supervisor: ProcessSupervisor,
    /// Worker output and lifecycle events.
    pub events: UnboundedReceiver<SupervisorEvent>,
}

/// Wire the settings store, event channel and supervisor together.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let store = Arc::new(JsonConfigStore::open(config.config_path));
    let (sink, events) = channel_sink();
    let supervisor =
        ProcessSupervisor::new(store.clone(), sink).with_config(config.supervisor);

    CliContext {
        store,
        supervisor,
        events,
    }
}
