#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;

use crate::QueueResult;

/// Storage port for named FIFO lists.
///
/// A store hosts arbitrarily many independently-named queues; the queue name
/// is an opaque string scoping a list within the store's keyspace. All methods
/// must be safe for concurrent invocation by multiple callers, and the store
/// alone guarantees that a removed item is delivered to exactly one caller -
/// consumers add no locking of their own around queue access.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append a serialized payload to the tail of the named queue
    async fn push_back(&self, queue: &str, payload: Vec<u8>) -> QueueResult<()>;

    /// Remove and return the head of the named queue, waiting up to `timeout`
    /// for an item to arrive.
    ///
    /// Returns `Ok(None)` when the timeout lapses with the queue still empty -
    /// a normal idle outcome, never an error. `Err` is reserved for
    /// connectivity/protocol failure. Implementations must block the caller
    /// efficiently (no busy-polling) while waiting.
    async fn pop_front(&self, queue: &str, timeout: Duration) -> QueueResult<Option<Vec<u8>>>;

    /// Count of items not yet removed from the named queue
    async fn len(&self, queue: &str) -> QueueResult<usize>;

    /// Atomically remove all items from the named queue
    async fn clear(&self, queue: &str) -> QueueResult<()>;
}
