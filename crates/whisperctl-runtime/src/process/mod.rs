//! Managed worker process: spawn, capture, probe, terminate.

pub mod platform;
pub mod probe;
pub mod pump;
mod supervisor;

#[cfg(windows)]
pub use platform::CREATE_NO_WINDOW;
pub use platform::{FallbackPlatform, ProcessPlatform, SpawnSpec, default_platform};
pub use probe::{Liveness, Observation, ProcessIdentity, ProcessProbe, ResourceUsage};
pub use pump::{
    JoinOutcome, MAX_LINE_BYTES, PumpHandle, PumpState, join_pumps, spawn_stream_pump,
};
pub use supervisor::{ProcessSupervisor, SupervisorConfig};
