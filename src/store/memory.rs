use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::store::QueueStore;
use crate::QueueResult;

/// One named queue: its items plus the wakeup used by blocked consumers.
struct Shard {
    items: VecDeque<Vec<u8>>,
    arrival: Arc<Notify>,
}

impl Shard {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
            arrival: Arc::new(Notify::new()),
        }
    }
}

/// In-memory store for testing and development.
///
/// Queues live only as long as the store itself; production deployments that
/// need durability across process restarts use the Redis store instead.
/// Blocked `pop_front` callers park on a per-queue [`Notify`] rather than
/// polling, so idle consumers consume no CPU and react promptly to arrivals.
pub struct MemoryStore {
    shards: Mutex<HashMap<String, Shard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shards: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn push_back(&self, queue: &str, payload: Vec<u8>) -> QueueResult<()> {
        let mut shards = self.shards.lock();
        let shard = shards
            .entry(queue.to_string())
            .or_insert_with(Shard::new);
        shard.items.push_back(payload);
        // One item, one wakeup. A permit is stored if nobody is waiting, so a
        // consumer that arrives between push and wait is not lost.
        shard.arrival.notify_one();
        Ok(())
    }

    async fn pop_front(&self, queue: &str, timeout: Duration) -> QueueResult<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            // The lock is never held across an await point.
            let arrival = {
                let mut shards = self.shards.lock();
                let shard = shards
                    .entry(queue.to_string())
                    .or_insert_with(Shard::new);
                if let Some(item) = shard.items.pop_front() {
                    return Ok(Some(item));
                }
                Arc::clone(&shard.arrival)
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, arrival.notified())
                .await
                .is_err()
            {
                // Timed out; one last non-blocking look in case a push landed
                // as the timer fired.
                let mut shards = self.shards.lock();
                let item = shards
                    .get_mut(queue)
                    .and_then(|shard| shard.items.pop_front());
                return Ok(item);
            }
            // Woken by an arrival; loop to race for the item.
        }
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        let shards = self.shards.lock();
        Ok(shards.get(queue).map(|shard| shard.items.len()).unwrap_or(0))
    }

    async fn clear(&self, queue: &str) -> QueueResult<()> {
        let mut shards = self.shards.lock();
        if let Some(shard) = shards.get_mut(queue) {
            shard.items.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_items_in_push_order() {
        let store = MemoryStore::new();
        store.push_back("q", b"one".to_vec()).await.unwrap();
        store.push_back("q", b"two".to_vec()).await.unwrap();

        let first = store.pop_front("q", Duration::from_millis(50)).await.unwrap();
        let second = store.pop_front("q", Duration::from_millis(50)).await.unwrap();
        assert_eq!(first.as_deref(), Some(b"one".as_slice()));
        assert_eq!(second.as_deref(), Some(b"two".as_slice()));
    }

    #[tokio::test]
    async fn pop_on_empty_queue_times_out_with_none() {
        let store = MemoryStore::new();
        let started = Instant::now();
        let popped = store.pop_front("q", Duration::from_millis(100)).await.unwrap();
        assert!(popped.is_none());
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn blocked_pop_wakes_on_push() {
        let store = Arc::new(MemoryStore::new());

        let consumer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.pop_front("q", Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.push_back("q", b"late".to_vec()).await.unwrap();

        let popped = consumer.await.unwrap().unwrap();
        assert_eq!(popped.as_deref(), Some(b"late".as_slice()));
    }

    #[tokio::test]
    async fn queues_are_isolated_by_name() {
        let store = MemoryStore::new();
        store.push_back("a", b"for-a".to_vec()).await.unwrap();

        assert_eq!(store.len("a").await.unwrap(), 1);
        assert_eq!(store.len("b").await.unwrap(), 0);
        let from_b = store.pop_front("b", Duration::from_millis(20)).await.unwrap();
        assert!(from_b.is_none());
        assert_eq!(store.len("a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_empties_only_the_named_queue() {
        let store = MemoryStore::new();
        store.push_back("a", b"1".to_vec()).await.unwrap();
        store.push_back("a", b"2".to_vec()).await.unwrap();
        store.push_back("b", b"3".to_vec()).await.unwrap();

        store.clear("a").await.unwrap();
        assert_eq!(store.len("a").await.unwrap(), 0);
        assert_eq!(store.len("b").await.unwrap(), 1);
    }
}
