//! Windows process control.
//!
//! There is no SIGTERM. `taskkill` without `/F` posts a close request to the
//! process tree, which console interpreters may ignore; the supervisor then
//! escalates to `taskkill /F /T` for the tree and `TerminateProcess` through
//! [`Child::start_kill`] for the worker itself.

use std::io;
use std::os::windows::process::CommandExt;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::{ProcessPlatform, SpawnSpec};

/// Keeps spawned console programs from flashing a window.
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// `taskkill` for graceful stop, `TerminateProcess` for force kill.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsPlatform;

#[async_trait]
impl ProcessPlatform for WindowsPlatform {
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child> {
        let mut cmd = spec.to_command();
        cmd.creation_flags(CREATE_NO_WINDOW);
        cmd.spawn()
    }

    async fn request_graceful_stop(&self, pid: u32) -> io::Result<()> {
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .creation_flags(CREATE_NO_WINDOW)
            .status()
            .await?;
        // taskkill exits 128 when the process no longer exists
        if status.success() || status.code() == Some(128) {
            Ok(())
        } else {
            Err(io::Error::other(format!("taskkill exited with {status}")))
        }
    }

    fn force_kill(&self, child: &mut Child) -> io::Result<()> {
        if let Some(pid) = child.id() {
            // Fire and forget; the worker itself is terminated below
            let _ = std::process::Command::new("taskkill")
                .args(["/F", "/T", "/PID", &pid.to_string()])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .creation_flags(CREATE_NO_WINDOW)
                .spawn();
        }
        child.start_kill()
    }
}
