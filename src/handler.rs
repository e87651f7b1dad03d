use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;

/// Pluggable execution logic for dequeued jobs - the sole extension point for
/// job semantics.
///
/// The handler receives the raw payload bytes exactly as they were enqueued;
/// the queue never inspects or validates them. The cancellation token is the
/// execution context: it is cancelled when the owning processor is shutting
/// down, and observing it is cooperative - the processor never force-aborts a
/// running handler. A returned error is logged and the job permanently
/// dropped; there is no retry, requeue, or dead-letter path.
///
/// One handler instance is shared across the whole worker pool, so
/// implementations must be safe for concurrent invocation.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one job payload
    async fn handle(&self, cancel: CancellationToken, payload: &[u8]) -> Result<(), HandlerError>;
}
