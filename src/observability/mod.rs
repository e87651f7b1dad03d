use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Minimal stable event protocol for structured observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum QueueEvent {
    /// A payload was appended to the named queue
    Enqueued {
        queue: String,
        bytes: usize,
        at: DateTime<Utc>,
    },

    /// A payload was removed from the named queue for dispatch
    Dequeued {
        queue: String,
        bytes: usize,
        at: DateTime<Utc>,
    },

    /// The handler processed a job successfully
    HandlerSucceeded {
        queue: String,
        worker: usize,
        at: DateTime<Utc>,
    },

    /// The handler reported failure; the job is dropped
    HandlerFailed {
        queue: String,
        worker: usize,
        error: String,
        at: DateTime<Utc>,
    },

    /// A store operation failed; treated as transient by the worker loop
    StoreError {
        queue: String,
        operation: String,
        error: String,
        at: DateTime<Utc>,
    },

    /// A worker loop began draining the queue
    WorkerStarted { worker: usize, at: DateTime<Utc> },

    /// A worker loop observed shutdown and exited
    WorkerStopped { worker: usize, at: DateTime<Utc> },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Dequeued { .. } => "dequeued",
            Self::HandlerSucceeded { .. } => "handler_succeeded",
            Self::HandlerFailed { .. } => "handler_failed",
            Self::StoreError { .. } => "store_error",
            Self::WorkerStarted { .. } => "worker_started",
            Self::WorkerStopped { .. } => "worker_stopped",
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Enqueued { at, .. } => at,
            Self::Dequeued { at, .. } => at,
            Self::HandlerSucceeded { at, .. } => at,
            Self::HandlerFailed { at, .. } => at,
            Self::StoreError { at, .. } => at,
            Self::WorkerStarted { at, .. } => at,
            Self::WorkerStopped { at, .. } => at,
        }
    }
}

/// Injected sink for queue lifecycle events.
///
/// The queue and processor emit through this seam instead of a global logger,
/// keeping the core unit-testable without log-output assertions. `emit` is
/// synchronous and infallible; a sink that does real I/O should buffer.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: QueueEvent);
}

/// Default sink: forwards events to the `tracing` subscriber.
///
/// Consumers wire up their own subscriber; the library never installs one.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: QueueEvent) {
        match &event {
            QueueEvent::Enqueued { queue, bytes, .. } => {
                debug!(queue = %queue, bytes, "job enqueued");
            }
            QueueEvent::Dequeued { queue, bytes, .. } => {
                debug!(queue = %queue, bytes, "job dequeued");
            }
            QueueEvent::HandlerSucceeded { queue, worker, .. } => {
                info!(queue = %queue, worker, "job processed");
            }
            QueueEvent::HandlerFailed {
                queue,
                worker,
                error,
                ..
            } => {
                error!(queue = %queue, worker, error = %error, "handler failed, job dropped");
            }
            QueueEvent::StoreError {
                queue,
                operation,
                error,
                ..
            } => {
                warn!(queue = %queue, operation = %operation, error = %error, "store error, continuing");
            }
            QueueEvent::WorkerStarted { worker, .. } => {
                debug!(worker, "worker started");
            }
            QueueEvent::WorkerStopped { worker, .. } => {
                debug!(worker, "worker stopped");
            }
        }
    }
}

/// Buffering sink that records every event, for tests and inspection
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<QueueEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().clone()
    }

    /// Count of recorded events matching the given name
    pub fn count(&self, event_name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.event_name() == event_name)
            .count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: QueueEvent) {
        self.events.lock().push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: QueueEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_stable() {
        let event = QueueEvent::Enqueued {
            queue: "q".to_string(),
            bytes: 3,
            at: Utc::now(),
        };
        assert_eq!(event.event_name(), "enqueued");

        let event = QueueEvent::HandlerFailed {
            queue: "q".to_string(),
            worker: 0,
            error: "boom".to_string(),
            at: Utc::now(),
        };
        assert_eq!(event.event_name(), "handler_failed");
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(QueueEvent::WorkerStarted {
            worker: 0,
            at: Utc::now(),
        });
        sink.emit(QueueEvent::WorkerStopped {
            worker: 0,
            at: Utc::now(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_name(), "worker_started");
        assert_eq!(events[1].event_name(), "worker_stopped");
        assert_eq!(sink.count("worker_started"), 1);
    }
}
