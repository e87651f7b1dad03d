use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
#[cfg(feature = "json")]
use tracing::instrument;

use crate::observability::{EventSink, QueueEvent, TracingSink};
use crate::store::QueueStore;
use crate::QueueResult;

/// Facade over one named queue in a [`QueueStore`].
///
/// Cheap to clone; producers and the worker pool share the same store handle
/// through their clones. The store alone provides the atomicity guarantee
/// that a removed item goes to exactly one caller, so this type adds no
/// locking of its own.
pub struct JobQueue<S: QueueStore> {
    store: Arc<S>,
    name: String,
    events: Arc<dyn EventSink>,
}

impl<S: QueueStore> JobQueue<S> {
    /// Create a queue facade for the named list in `store`
    pub fn new(store: Arc<S>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            events: Arc::new(TracingSink),
        }
    }

    /// Create the queue with a custom event sink
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The queue name scoping this list in the store's keyspace
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize `payload` and append it to the tail of the queue.
    ///
    /// Returns a serialization error if encoding fails, a store error if the
    /// append fails. On success the queue length grows by exactly one and the
    /// item is eligible for the next dequeue.
    #[cfg(feature = "json")]
    #[instrument(skip(self, payload), fields(queue = %self.name))]
    pub async fn enqueue<T: serde::Serialize>(&self, payload: &T) -> QueueResult<()> {
        let bytes = serde_json::to_vec(payload)?;
        self.enqueue_raw(bytes).await
    }

    /// Append pre-serialized payload bytes to the tail of the queue
    pub async fn enqueue_raw(&self, payload: Vec<u8>) -> QueueResult<()> {
        let bytes = payload.len();
        self.store.push_back(&self.name, payload).await?;
        self.events.emit(QueueEvent::Enqueued {
            queue: self.name.clone(),
            bytes,
            at: Utc::now(),
        });
        Ok(())
    }

    /// Remove and return the head item, waiting up to `timeout` for one to
    /// arrive. `Ok(None)` means the queue stayed empty for the full interval.
    pub async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<Vec<u8>>> {
        let popped = self.store.pop_front(&self.name, timeout).await?;
        if let Some(ref payload) = popped {
            self.events.emit(QueueEvent::Dequeued {
                queue: self.name.clone(),
                bytes: payload.len(),
                at: Utc::now(),
            });
        }
        Ok(popped)
    }

    /// Current count of items not yet dequeued
    pub async fn len(&self) -> QueueResult<usize> {
        self.store.len(&self.name).await
    }

    /// Whether the queue currently holds no items
    pub async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Atomically remove all items from the queue
    pub async fn clear(&self) -> QueueResult<()> {
        self.store.clear(&self.name).await
    }

    pub(crate) fn events(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.events)
    }
}

impl<S: QueueStore> Clone for JobQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            events: Arc::clone(&self.events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use crate::store::memory::MemoryStore;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct TestPayload {
        id: u32,
        body: String,
    }

    fn test_queue() -> (JobQueue<MemoryStore>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let queue = JobQueue::new(Arc::new(MemoryStore::new()), "default")
            .with_events(sink.clone() as Arc<dyn EventSink>);
        (queue, sink)
    }

    #[tokio::test]
    async fn enqueue_serializes_and_dequeue_returns_same_bytes() {
        let (queue, _sink) = test_queue();
        let payload = TestPayload {
            id: 7,
            body: "hello".to_string(),
        };

        queue.enqueue(&payload).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 1);

        let bytes = queue
            .dequeue(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        let decoded: TestPayload = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, payload);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_emit_events() {
        let (queue, sink) = test_queue();
        queue.enqueue_raw(b"raw".to_vec()).await.unwrap();
        queue.dequeue(Duration::from_millis(50)).await.unwrap();

        assert_eq!(sink.count("enqueued"), 1);
        assert_eq!(sink.count("dequeued"), 1);
    }

    #[tokio::test]
    async fn idle_dequeue_emits_nothing() {
        let (queue, sink) = test_queue();
        let popped = queue.dequeue(Duration::from_millis(20)).await.unwrap();
        assert!(popped.is_none());
        assert_eq!(sink.events().len(), 0);
    }
}
