//! Line-oriented readers for child stdout/stderr.
//!
//! Workers can emit non-UTF8 bytes, and `BufReader::lines()` gives up on
//! invalid UTF-8. Pumps read raw bytes up to each newline and decode lossily
//! so one bad byte never ends the capture.
//!
//! A line longer than [`MAX_LINE_BYTES`] is forwarded in pieces of that size,
//! so a worker redrawing a progress bar with `\r` cannot grow the buffer
//! without bound.
//!
//! Each pump is its own task. A pump that is still blocked on a read when the
//! supervisor gives up on it is *abandoned*: its gate is sealed so it can
//! never emit again, then it is cancelled and detached.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use whisperctl_core::{OutputSink, StreamTag, SupervisorEvent};

/// Longest line forwarded as a single event.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Lifecycle of a stream pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Created, task not yet polled.
    Idle,
    /// Reading lines.
    Running,
    /// Stop requested or end of stream reached; finishing up.
    Draining,
    /// Terminal.
    Stopped,
}

impl PumpState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Result of [`PumpHandle::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The pump finished on its own.
    Joined,
    /// The pump did not finish in time and was sealed and detached.
    Abandoned,
}

struct Shared {
    state: AtomicU8,
    /// `true` once the pump may no longer emit.
    sealed: Mutex<bool>,
    cancel: CancellationToken,
}

impl Shared {
    fn state(&self) -> PumpState {
        PumpState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PumpState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Deliver `event` unless the gate is sealed.
    ///
    /// The gate lock is held across the emit so that sealing waits for an
    /// in-flight event instead of racing it.
    fn emit(&self, sink: &dyn OutputSink, event: SupervisorEvent) -> bool {
        let sealed = self.sealed.lock().unwrap_or_else(PoisonError::into_inner);
        if *sealed {
            return false;
        }
        sink.emit(event);
        true
    }

    fn seal(&self) {
        *self.sealed.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// Handle to a running stream pump.
pub struct PumpHandle {
    stream: StreamTag,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PumpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpHandle")
            .field("stream", &self.stream)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PumpHandle {
    /// Stream this pump reads.
    pub const fn stream(&self) -> StreamTag {
        self.stream
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PumpState {
        self.shared.state()
    }

    /// Mark the pump as draining. It keeps reading until EOF.
    pub fn begin_drain(&self) {
        let _ = self.shared.state.compare_exchange(
            PumpState::Running as u8,
            PumpState::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Wait up to `limit` for the pump to finish.
    ///
    /// On timeout the pump is sealed, cancelled and detached; it emits
    /// nothing afterwards.
    pub async fn join(&mut self, limit: Duration) -> JoinOutcome {
        let Some(task) = self.task.as_mut() else {
            return JoinOutcome::Joined;
        };

        if let Ok(result) = timeout(limit, task).await {
            if let Err(e) = result {
                debug!(stream = %self.stream, error = %e, "Stream pump task ended abnormally");
            }
            self.task = None;
            self.shared.set_state(PumpState::Stopped);
            return JoinOutcome::Joined;
        }

        self.abandon();
        warn!(stream = %self.stream, ?limit, "Stream pump did not finish in time, abandoning");
        JoinOutcome::Abandoned
    }

    /// Seal, cancel and detach without waiting.
    pub fn abandon(&mut self) {
        self.shared.seal();
        self.shared.cancel.cancel();
        self.shared.set_state(PumpState::Stopped);
        // Dropping the JoinHandle detaches the task; cancellation ends it.
        self.task = None;
    }
}

/// Join every pump in `pumps` within a single `limit`.
///
/// The usual stdout/stderr pair is joined concurrently; any other count
/// shares one deadline.
pub async fn join_pumps(pumps: &mut [PumpHandle], limit: Duration) -> Vec<JoinOutcome> {
    if let [out, err] = pumps {
        let (out, err) = tokio::join!(out.join(limit), err.join(limit));
        return vec![out, err];
    }

    let deadline = Instant::now() + limit;
    let mut outcomes = Vec::with_capacity(pumps.len());
    for pump in pumps {
        let remaining = deadline.saturating_duration_since(Instant::now());
        outcomes.push(pump.join(remaining).await);
    }
    outcomes
}

/// Spawn a pump that forwards each line of `stream` to `sink` as
/// [`SupervisorEvent::Output`] tagged with `tag`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_stream_pump<R>(stream: R, tag: StreamTag, sink: Arc<dyn OutputSink>) -> PumpHandle
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let shared = Arc::new(Shared {
        state: AtomicU8::new(PumpState::Idle as u8),
        sealed: Mutex::new(false),
        cancel: CancellationToken::new(),
    });

    let task_shared = Arc::clone(&shared);
    let task = tokio::spawn(async move {
        let _ = task_shared.state.compare_exchange(
            PumpState::Idle as u8,
            PumpState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        pump_lines(stream, tag, sink.as_ref(), &task_shared).await;
        task_shared.set_state(PumpState::Stopped);
        debug!(stream = %tag, "Stream pump exiting");
    });

    PumpHandle {
        stream: tag,
        shared,
        task: Some(task),
    }
}

async fn pump_lines<R>(stream: R, tag: StreamTag, sink: &dyn OutputSink, shared: &Shared)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    // Previous chunk hit the length cap without a newline
    let mut split = false;

    loop {
        buf.clear();
        let mut chunk = (&mut reader).take(MAX_LINE_BYTES as u64);
        let read = tokio::select! {
            () = shared.cancel.cancelled() => return,
            read = chunk.read_until(b'\n', &mut buf) => read,
        };

        match read {
            Ok(0) => {
                shared.set_state(PumpState::Draining);
                break;
            }
            Ok(_) => {
                let capped = buf.last() != Some(&b'\n') && buf.len() == MAX_LINE_BYTES;
                trim_line_ending(&mut buf);
                // The newline that ends an already forwarded long line
                let tail_of_split = split && buf.is_empty();
                split = capped;
                if tail_of_split {
                    continue;
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if !shared.emit(sink, SupervisorEvent::output(tag, line)) {
                    return;
                }
            }
            Err(e) => {
                shared.set_state(PumpState::Draining);
                let diagnostic = format!("[{tag} pump] read error: {e}");
                shared.emit(sink, SupervisorEvent::output(StreamTag::Err, diagnostic));
                break;
            }
        }
    }

    shared.emit(sink, SupervisorEvent::StreamClosed { stream: tag });
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
