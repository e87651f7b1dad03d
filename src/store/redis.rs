use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::store::QueueStore;
use crate::QueueResult;

/// Redis-backed store: each named queue is one Redis list.
///
/// Maps the store protocol directly onto list commands - RPUSH at the tail,
/// BLPOP with timeout at the head, LLEN for length, DEL for clear. BLPOP's
/// nil-on-timeout reply becomes `Ok(None)`. Queues persist independently of
/// any consumer process, keyed by name in the Redis keyspace.
///
/// The [`ConnectionManager`] multiplexes and reconnects automatically, so one
/// store handle is safely shared across producers and the whole worker pool.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to a Redis instance, e.g. `redis://127.0.0.1:6379`
    pub async fn connect(url: &str) -> QueueResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Wrap an existing managed connection
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn push_back(&self, queue: &str, payload: Vec<u8>) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(queue, payload).await?;
        Ok(())
    }

    async fn pop_front(&self, queue: &str, timeout: Duration) -> QueueResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        // BLPOP returns (key, value), or nil once the timeout lapses.
        let reply: Option<(String, Vec<u8>)> = conn.blpop(queue, timeout.as_secs_f64()).await?;
        Ok(reply.map(|(_, payload)| payload))
    }

    async fn len(&self, queue: &str) -> QueueResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.llen(queue).await?;
        Ok(count)
    }

    async fn clear(&self, queue: &str) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(queue).await?;
        Ok(())
    }
}
