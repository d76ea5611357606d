//! Worker control trait definition.
//!
//! This port is what a front end (GUI, CLI, tests) drives. Implementations
//! own at most one worker process at a time.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ControlError;
use crate::status::StatusSnapshot;

/// Lifecycle control over a single long-lived worker process.
///
/// # Design Rules
///
/// - Express **intent**, not implementation detail
/// - Every failure is a typed [`ControlError`]; nothing retries on its own
/// - `stop` is bounded: it never blocks longer than its timeout plus the
///   forced-kill grace period
#[async_trait]
pub trait WorkerControl: Send + Sync {
    /// Validate configuration and spawn the worker with `model`.
    ///
    /// Returns `Err(ControlError::AlreadyRunning)` if a worker is alive.
    async fn start(&self, model: &str) -> Result<(), ControlError>;

    /// Stop the worker, escalating to a forced kill after `timeout`.
    ///
    /// Returns `Err(ControlError::NotRunning)` if no worker is alive.
    async fn stop(&self, timeout: Duration) -> Result<(), ControlError>;

    /// Stop (tolerating `NotRunning`) then start with `model`.
    async fn restart(&self, model: &str) -> Result<(), ControlError>;

    /// Whether the managed worker is alive, verified against its identity.
    async fn is_running(&self) -> bool;

    /// Build a fresh status snapshot.
    async fn status(&self) -> StatusSnapshot;
}
