//! Per-platform spawn and termination.
//!
//! The supervisor never signals a pid directly. It asks a
//! [`ProcessPlatform`] to spawn, to request a graceful stop, or to force a
//! kill, and the platform picks the OS mechanism:
//!
//! | Platform | graceful stop            | force kill             |
//! |----------|--------------------------|------------------------|
//! | Unix     | `SIGTERM` to the group   | `SIGKILL` to the group |
//! | Windows  | `taskkill /PID <pid> /T` | `TerminateProcess`     |
//! | other    | unsupported (escalates)  | runtime default kill   |

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::{Child, Command};

#[cfg(unix)]
pub use unix::UnixPlatform;
#[cfg(windows)]
pub use windows::{CREATE_NO_WINDOW, WindowsPlatform};

/// What to launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Extra environment variables layered over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub current_dir: Option<PathBuf>,
}

impl SpawnSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Build the base command: stdin closed, stdout/stderr piped, killed
    /// when the handle is dropped.
    ///
    /// On Unix the process leads a new process group (pgid == pid) so that
    /// signals can reach everything it forks.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

/// OS capabilities the supervisor relies on.
#[async_trait]
pub trait ProcessPlatform: Send + Sync {
    /// Launch a process from `spec` with piped stdout and stderr.
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child>;

    /// Ask process `pid` and its descendants to exit. Returns without
    /// waiting for them to do so.
    ///
    /// A process that is already gone is not an error.
    async fn request_graceful_stop(&self, pid: u32) -> io::Result<()>;

    /// Kill the process behind `child` and its descendants immediately.
    /// Does not wait.
    fn force_kill(&self, child: &mut Child) -> io::Result<()>;
}

/// Platform without a graceful stop primitive. Every stop escalates.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPlatform;

#[async_trait]
impl ProcessPlatform for FallbackPlatform {
    fn spawn(&self, spec: &SpawnSpec) -> io::Result<Child> {
        spec.to_command().spawn()
    }

    async fn request_graceful_stop(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "graceful stop is not supported on this platform",
        ))
    }

    fn force_kill(&self, child: &mut Child) -> io::Result<()> {
        child.start_kill()
    }
}

/// Platform implementation for the current OS.
pub fn default_platform() -> Arc<dyn ProcessPlatform> {
    #[cfg(unix)]
    {
        Arc::new(UnixPlatform)
    }

    #[cfg(windows)]
    {
        Arc::new(WindowsPlatform)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(FallbackPlatform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_spec_builder() {
        let spec = SpawnSpec::new("/usr/bin/python3")
            .arg("worker.py")
            .arg("base")
            .env("PYTHONUNBUFFERED", "1")
            .current_dir("/srv");
        assert_eq!(spec.args, ["worker.py", "base"]);
        assert_eq!(spec.env.get("PYTHONUNBUFFERED").map(String::as_str), Some("1"));
        assert_eq!(spec.current_dir, Some(PathBuf::from("/srv")));
    }

    #[tokio::test]
    async fn fallback_graceful_stop_is_unsupported() {
        let err = FallbackPlatform.request_graceful_stop(1).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
