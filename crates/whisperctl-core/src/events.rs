//! Events emitted by the supervisor to its output sink.
//!
//! Presentation layers drain these (from a channel, a log, a UI event loop)
//! to mirror worker output and lifecycle without sharing the supervisor's
//! threading model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamTag {
    /// Standard output.
    Out,
    /// Standard error (also used for pump diagnostics).
    Err,
}

impl StreamTag {
    /// Conventional stream name (`stdout` / `stderr`).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Out => "stdout",
            Self::Err => "stderr",
        }
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single complete line read from a child stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: StreamTag,
    pub timestamp: DateTime<Utc>,
    /// Line content without the trailing newline.
    pub text: String,
}

impl OutputLine {
    /// Create a line stamped with the current time.
    pub fn now(stream: StreamTag, text: impl Into<String>) -> Self {
        Self {
            stream,
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

/// Supervisor event payload.
///
/// Within one stream `Output` events arrive in the order the child wrote
/// them. `Stopped` is emitted only after both stream pumps were joined or
/// abandoned, so no output follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorEvent {
    /// A worker process was spawned.
    Started { pid: u32, model: String },

    /// A line of worker output.
    Output(OutputLine),

    /// A stream pump reached its terminal state.
    StreamClosed { stream: StreamTag },

    /// The worker was stopped on request.
    Stopped { pid: u32, forced: bool },

    /// The worker terminated on its own.
    Exited { pid: u32, code: Option<i32> },
}

impl SupervisorEvent {
    /// Shorthand for an output event stamped now.
    pub fn output(stream: StreamTag, text: impl Into<String>) -> Self {
        Self::Output(OutputLine::now(stream, text))
    }

    /// Borrow the output line if this is an output event.
    pub const fn as_output(&self) -> Option<&OutputLine> {
        match self {
            Self::Output(line) => Some(line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_is_tagged() {
        let event = SupervisorEvent::Started {
            pid: 42,
            model: "base".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"started\""));
        assert!(json.contains("\"pid\":42"));
    }

    #[test]
    fn output_event_carries_stream_tag() {
        let event = SupervisorEvent::output(StreamTag::Err, "warning: fp16");
        let line = event.as_output().unwrap();
        assert_eq!(line.stream, StreamTag::Err);
        assert_eq!(line.text, "warning: fp16");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"stream\":\"err\""));
    }

    #[test]
    fn stream_tag_display() {
        assert_eq!(StreamTag::Out.to_string(), "stdout");
        assert_eq!(StreamTag::Err.to_string(), "stderr");
    }
}
