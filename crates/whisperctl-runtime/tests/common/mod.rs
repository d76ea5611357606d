//! Shared fixtures for whisperctl-runtime integration tests.
//!
//! Workers are shell snippets saved with a `.py` extension and run through a
//! fake interpreter that answers `--version` like Python and otherwise hands
//! its arguments to `/bin/sh`. No real Python is needed.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, timeout};
use whisperctl_core::{ConfigStore, OutputLine, StreamTag, SupervisorEvent};
use whisperctl_runtime::SupervisorConfig;

const FAKE_INTERPRETER: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "Python 3.11.4"
    exit 0
fi
exec /bin/sh "$@"
"#;

/// Upper bound on any single wait in these tests.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Temporary directory holding a fake interpreter and worker scripts.
pub struct Fixture {
    pub dir: TempDir,
    pub interpreter: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let interpreter = dir.path().join("python3");
        write_executable(&interpreter, FAKE_INTERPRETER);
        Self { dir, interpreter }
    }

    /// Write a worker script named `<name>.py` containing shell `body`.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(format!("{name}.py"));
        fs::write(&path, body).expect("write worker script");
        path
    }

    /// Config store pointing at this fixture's interpreter and `script`.
    pub fn store(&self, script: &Path) -> Arc<TestStore> {
        Arc::new(TestStore {
            interpreter: Mutex::new(self.interpreter.display().to_string()),
            script: Mutex::new(script.display().to_string()),
        })
    }
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, body).expect("write executable");
    let mut perms = fs::metadata(path).expect("stat executable").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod executable");
}

/// Mutable in-memory config store.
#[derive(Debug)]
pub struct TestStore {
    interpreter: Mutex<String>,
    script: Mutex<String>,
}

impl TestStore {
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            interpreter: Mutex::new("python3".to_string()),
            script: Mutex::new(String::new()),
        })
    }

    pub fn set_script(&self, script: &Path) {
        *self.script.lock().unwrap() = script.display().to_string();
    }
}

impl ConfigStore for TestStore {
    fn interpreter_path(&self) -> String {
        self.interpreter.lock().unwrap().clone()
    }

    fn script_path(&self) -> String {
        self.script.lock().unwrap().clone()
    }

    fn selected_model(&self) -> String {
        "base".to_string()
    }
}

/// Supervisor timings tightened for tests.
pub fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        poll_interval: Duration::from_millis(50),
        pump_join_timeout: Duration::from_secs(1),
        kill_grace: Duration::from_secs(2),
        ..SupervisorConfig::default()
    }
}

/// Receive events until `done` matches one (inclusive) or the deadline hits.
pub async fn collect_until(
    rx: &mut UnboundedReceiver<SupervisorEvent>,
    mut done: impl FnMut(&SupervisorEvent) -> bool,
) -> Vec<SupervisorEvent> {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    let mut events = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Ok(Some(event)) = timeout(remaining, rx.recv()).await else {
            break;
        };
        let finished = done(&event);
        events.push(event);
        if finished {
            break;
        }
    }
    events
}

/// Wait for an output line with exactly `text`.
pub async fn wait_for_line(
    rx: &mut UnboundedReceiver<SupervisorEvent>,
    text: &str,
) -> Vec<SupervisorEvent> {
    let events = collect_until(rx, |e| e.as_output().is_some_and(|l| l.text == text)).await;
    assert!(
        events
            .last()
            .and_then(SupervisorEvent::as_output)
            .is_some_and(|l| l.text == text),
        "never saw line {text:?}; got {events:?}"
    );
    events
}

/// Output lines from `events` on `stream`.
pub fn lines_on(events: &[SupervisorEvent], stream: StreamTag) -> Vec<String> {
    events
        .iter()
        .filter_map(SupervisorEvent::as_output)
        .filter(|line: &&OutputLine| line.stream == stream)
        .map(|line| line.text.clone())
        .collect()
}

/// Drain whatever is already queued.
pub fn drain(rx: &mut UnboundedReceiver<SupervisorEvent>) -> Vec<SupervisorEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
