//! Ready-made [`OutputSink`] implementations.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use whisperctl_core::{OutputSink, StreamTag, SupervisorEvent};

/// Forwards events into an unbounded channel.
///
/// `emit` never blocks. Events sent after the receiver is dropped are
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SupervisorEvent>,
}

impl ChannelSink {
    pub const fn new(tx: mpsc::UnboundedSender<SupervisorEvent>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn emit(&self, event: SupervisorEvent) {
        let _ = self.tx.send(event);
    }
}

/// Create a channel sink and its receiving end.
pub fn channel_sink() -> (Arc<ChannelSink>, mpsc::UnboundedReceiver<SupervisorEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelSink::new(tx)), rx)
}

/// Writes worker output and lifecycle events to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn emit(&self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::Output(line) => match line.stream {
                StreamTag::Out => info!(target: "whisperctl::worker", "{}", line.text),
                StreamTag::Err => warn!(target: "whisperctl::worker", "{}", line.text),
            },
            SupervisorEvent::Started { pid, model } => {
                debug!(pid, %model, "Worker started");
            }
            SupervisorEvent::StreamClosed { stream } => debug!(%stream, "Worker stream closed"),
            SupervisorEvent::Stopped { pid, forced } => debug!(pid, forced, "Worker stopped"),
            SupervisorEvent::Exited { pid, code } => info!(pid, ?code, "Worker exited"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl OutputSink for NoopSink {
    fn emit(&self, _event: SupervisorEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_and_tolerates_closed_receiver() {
        let (sink, mut rx) = channel_sink();
        sink.emit(SupervisorEvent::StreamClosed {
            stream: StreamTag::Out,
        });
        assert!(matches!(
            rx.try_recv(),
            Ok(SupervisorEvent::StreamClosed { .. })
        ));

        drop(rx);
        sink.emit(SupervisorEvent::output(StreamTag::Out, "dropped"));
    }
}
