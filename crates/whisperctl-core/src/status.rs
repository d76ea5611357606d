//! Point-in-time worker status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable snapshot of the worker's state at the moment of a query.
///
/// Produced fresh from OS queries on every `status()` call and never cached.
/// Resource fields are `None` when the OS query failed or the worker is not
/// running.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub is_running: bool,
    pub pid: Option<u32>,
    /// Model the running worker was started with.
    pub model: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Resident memory in bytes.
    pub memory_bytes: Option<u64>,
    /// CPU usage in percent of one core since the previous sample.
    pub cpu_percent: Option<f32>,
    /// Message of the most recent failed operation.
    pub last_error: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot for a supervisor with no live worker.
    pub fn stopped(last_error: Option<String>) -> Self {
        Self {
            last_error,
            ..Self::default()
        }
    }

    /// Human-readable state label.
    pub const fn status_text(&self) -> &'static str {
        if self.is_running { "Running" } else { "Stopped" }
    }

    /// Time since the worker was started, if running.
    pub fn uptime(&self) -> Option<Duration> {
        let started = self.started_at?;
        if !self.is_running {
            return None;
        }
        (Utc::now() - started).to_std().ok()
    }

    /// Resident memory in mebibytes.
    #[allow(clippy::cast_precision_loss)]
    pub fn memory_mb(&self) -> Option<f64> {
        self.memory_bytes.map(|b| b as f64 / 1024.0 / 1024.0)
    }
}
