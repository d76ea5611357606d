//! Output sink port for worker output and lifecycle events.
//!
//! This port abstracts where supervisor events go, allowing different
//! implementations for the CLI (terminal), a GUI (event queue) and tests
//! (channel collection).

use crate::events::SupervisorEvent;

/// Destination for supervisor events.
///
/// Implementations must be thread-safe and non-blocking: `emit` is called
/// concurrently from both stream pump workers and from the control path.
/// The collaborator is responsible for marshaling events into its own loop.
pub trait OutputSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: SupervisorEvent);
}

impl<F> OutputSink for F
where
    F: Fn(SupervisorEvent) + Send + Sync,
{
    fn emit(&self, event: SupervisorEvent) {
        self(event);
    }
}
