//! Port definitions (trait abstractions) for the controller's collaborators.
//!
//! # Design Rules
//!
//! - No process handles or OS types in any signature
//! - The config store is read at call time, never cached by the controller
//! - Sinks must be callable concurrently from several pump workers

pub mod config_store;
pub mod output_sink;
pub mod worker_control;

pub use config_store::ConfigStore;
pub use output_sink::OutputSink;
pub use worker_control::WorkerControl;
