//! Terminal formatting for worker events and status.

use std::fmt::Write as _;

use chrono::Local;
use whisperctl_core::{OutputLine, StatusSnapshot, SupervisorEvent};

/// `[HH:MM:SS] text`, in local time.
pub fn format_line(line: &OutputLine) -> String {
    format!(
        "[{}] {}",
        line.timestamp.with_timezone(&Local).format("%H:%M:%S"),
        line.text
    )
}

/// Human-readable description of a lifecycle event. `None` for output.
pub fn describe_event(event: &SupervisorEvent) -> Option<String> {
    match event {
        SupervisorEvent::Output(_) => None,
        SupervisorEvent::Started { pid, model } => {
            Some(format!("Worker started (pid {pid}, model {model})"))
        }
        SupervisorEvent::StreamClosed { stream } => Some(format!("Worker {stream} closed")),
        SupervisorEvent::Stopped { pid, forced: false } => Some(format!("Worker {pid} stopped")),
        SupervisorEvent::Stopped { pid, forced: true } => {
            Some(format!("Worker {pid} did not exit in time and was killed"))
        }
        SupervisorEvent::Exited { pid, code } => Some(match code {
            Some(code) => format!("Worker {pid} exited with code {code}"),
            None => format!("Worker {pid} exited"),
        }),
    }
}

/// One-line status summary.
pub fn format_status(status: &StatusSnapshot) -> String {
    let mut line = format!("Status: {}", status.status_text());
    if let Some(pid) = status.pid {
        let _ = write!(line, " | PID: {pid}");
    }
    if let Some(model) = &status.model {
        let _ = write!(line, " | Model: {model}");
    }
    if let Some(uptime) = status.uptime() {
        let _ = write!(line, " | Uptime: {}s", uptime.as_secs());
    }
    if let Some(mb) = status.memory_mb() {
        let _ = write!(line, " | Memory: {mb:.1} MB");
    }
    if let Some(cpu) = status.cpu_percent {
        let _ = write!(line, " | CPU: {cpu:.1}%");
    }
    if let Some(err) = &status.last_error {
        let _ = write!(line, " | Last error: {err}");
    }
    line
}
