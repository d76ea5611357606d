//! Identity-checked liveness and resource sampling via sysinfo.
//!
//! A bare pid is not proof of life: once the worker is reaped the OS may hand
//! the same pid to an unrelated program. Every query therefore compares the
//! process start time against the one recorded at spawn.

use std::sync::{Mutex, PoisonError};

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

/// Pid plus the start time observed right after spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: u32,
    /// Seconds since the epoch, `None` if the OS would not report it.
    pub start_time: Option<u64>,
}

/// Result of a liveness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The original process is running.
    Alive,
    /// No process with this pid exists.
    Gone,
    /// The process exited but has not been reaped.
    Zombie,
    /// The pid now belongs to a different process.
    Replaced,
}

impl Liveness {
    pub const fn is_alive(self) -> bool {
        matches!(self, Self::Alive)
    }
}

/// Memory and CPU sample for one process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    /// Resident memory in bytes.
    pub memory_bytes: u64,
    /// Percent of one core since the previous sample.
    pub cpu_percent: f32,
}

/// Liveness plus usage, taken from a single refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub liveness: Liveness,
    /// `None` unless the process is [`Liveness::Alive`] and the OS reported
    /// its usage.
    pub usage: Option<ResourceUsage>,
}

/// Reusable sysinfo handle.
///
/// CPU usage is computed between consecutive refreshes, so keeping one
/// `System` around makes the second and later samples meaningful.
#[derive(Debug, Default)]
pub struct ProcessProbe {
    system: Mutex<System>,
}

impl ProcessProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Record the identity of a freshly spawned process.
    pub fn identify(&self, pid: u32) -> ProcessIdentity {
        let start_time = self.with_process(pid, |process| process.map(sysinfo::Process::start_time));
        ProcessIdentity { pid, start_time }
    }

    /// Whether the process behind `identity` is still the one we spawned.
    pub fn liveness(&self, identity: &ProcessIdentity) -> Liveness {
        self.observe(identity).liveness
    }

    /// Liveness and resource usage in one refresh.
    pub fn observe(&self, identity: &ProcessIdentity) -> Observation {
        self.with_process(identity.pid, |process| {
            let Some(process) = process else {
                return Observation {
                    liveness: Liveness::Gone,
                    usage: None,
                };
            };

            let liveness = classify(identity, process.start_time(), process.status());
            // A live process always has resident pages; zero means the query failed
            let usage = liveness
                .is_alive()
                .then(|| ResourceUsage {
                    memory_bytes: process.memory(),
                    cpu_percent: process.cpu_usage(),
                })
                .filter(|usage| usage.memory_bytes > 0);
            Observation { liveness, usage }
        })
    }

    fn with_process<T>(&self, pid: u32, f: impl FnOnce(Option<&sysinfo::Process>) -> T) -> T {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        let pid = Pid::from_u32(pid);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        f(system.process(pid))
    }
}

fn classify(identity: &ProcessIdentity, start_time: u64, status: ProcessStatus) -> Liveness {
    if matches!(status, ProcessStatus::Zombie | ProcessStatus::Dead) {
        return Liveness::Zombie;
    }
    match identity.start_time {
        Some(recorded) if recorded != start_time => Liveness::Replaced,
        _ => Liveness::Alive,
    }
}
