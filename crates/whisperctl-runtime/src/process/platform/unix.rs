//! Unix process control via signals.
//!
//! Workers are spawned as process group leaders (see
//! [`SpawnSpec::to_command`]), so both signals go to the whole group and
//! reach anything the worker forked.

use std::io;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tracing::debug;

use super::{ProcessPlatform, SpawnSpec};

/// `SIGTERM` for graceful stop, `SIGKILL` for force kill, both sent to the
/// worker's process group.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixPlatform;

fn signal_group(pid: u32, sig: Signal) -> io::Result<()> {
    let raw = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    match signal::killpg(Pid::from_raw(raw), sig) {
        // Whole group already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::other(e)),
    }
}

#[async_trait]
impl ProcessPlatform for UnixPlatform {
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child> {
        spec.to_command().spawn()
    }

    async fn request_graceful_stop(&self, pid: u32) -> io::Result<()> {
        signal_group(pid, Signal::SIGTERM)
    }

    fn force_kill(&self, child: &mut Child) -> io::Result<()> {
        let Some(pid) = child.id() else {
            // Already reaped
            return Ok(());
        };
        match signal_group(pid, Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(pid, error = %e, "killpg failed, killing the worker alone");
                child.start_kill()
            }
        }
    }
}
