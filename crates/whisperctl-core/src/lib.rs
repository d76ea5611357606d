//! Core domain types and port definitions for whisperctl.
//!
//! This crate describes *what* the worker controller talks about: the
//! point-in-time [`StatusSnapshot`], the [`SupervisorEvent`] stream emitted
//! to presentation layers, the typed error taxonomy, persisted [`Settings`],
//! and the ports (traits) that runtime adapters implement.
//!
//! Nothing in here spawns processes or touches OS process tables; that lives
//! in `whisperctl-runtime`.

#![deny(unused_crate_dependencies)]

pub mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;
pub mod status;

// Silence unused dev-dependency warnings for the lib test target
#[cfg(test)]
use tempfile as _;

pub use error::{ControlError, ControlErrorKind, ValidationError};
pub use events::{OutputLine, StreamTag, SupervisorEvent};
pub use paths::{PathError, config_file_path, data_root, logs_dir};
pub use ports::{ConfigStore, OutputSink, WorkerControl};
pub use settings::{
    DEFAULT_MODEL, JsonConfigStore, KNOWN_MODELS, Settings, SettingsError, SettingsUpdate,
    is_known_model, validate_model_name, validate_settings,
};
pub use status::StatusSnapshot;
