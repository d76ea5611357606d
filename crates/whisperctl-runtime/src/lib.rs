//! Process runtime and OS-level concerns for whisperctl.
//!
//! This crate owns everything that touches the operating system: launch
//! precondition checks ([`PathValidator`]), concurrent output capture
//! ([`process::spawn_stream_pump`]), per-platform spawn and termination
//! ([`process::ProcessPlatform`]), identity-checked liveness and resource
//! sampling ([`process::ProcessProbe`]), the [`ProcessSupervisor`] itself,
//! and one-shot model downloads ([`ModelDownloader`]).

#![deny(unsafe_code)]

pub mod download;
pub mod process;
pub mod sink;
pub mod validate;

pub use download::{DownloadCommand, ModelDownloader};
pub use process::{ProcessSupervisor, SupervisorConfig};
pub use sink::{ChannelSink, NoopSink, TracingSink, channel_sink};
pub use validate::{PathValidator, ValidatedPaths, ValidatorConfig, parse_version};

/// Cancellation token accepted by long-running operations such as downloads.
pub use tokio_util::sync::CancellationToken;
