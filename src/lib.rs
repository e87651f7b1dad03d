//! # dispatchq: Best-Effort FIFO Job Processing
//!
//! **A durable FIFO queue paired with a fixed-size async worker pool**
//!
//! dispatchq is an embedded library, not a service: the owning application
//! constructs a store, a queue, a handler, and a processor at startup, then
//! produces jobs with [`JobQueue::enqueue`] while the processor drains them.
//!
//! ## 🎯 Semantics
//!
//! - **Strict FIFO**: dequeue order reflects enqueue order, one global order
//!   per queue name
//! - **At-most-once**: a dequeued item is never delivered twice - handler
//!   failures are logged and the job dropped, never requeued
//! - **Opaque payloads**: jobs are raw bytes; the queue never inspects them
//! - **Blocking dequeue**: idle workers park on the store's native blocking
//!   removal (no busy-polling) with a bounded timeout that doubles as the
//!   shutdown check interval
//! - **Cooperative shutdown**: [`Processor::stop`] and token cancellation halt
//!   intake; in-flight handler calls always finish
//!
//! Deliberately out of scope: retries, dead-letter routing, delayed delivery,
//! deduplication. Applications that need those guarantees layer them into
//! their handler.
//!
//! ## 🚀 Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dispatchq::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! struct PrintHandler;
//!
//! #[async_trait]
//! impl JobHandler for PrintHandler {
//!     async fn handle(
//!         &self,
//!         _cancel: CancellationToken,
//!         payload: &[u8],
//!     ) -> Result<(), HandlerError> {
//!         println!("{}", String::from_utf8_lossy(payload));
//!         Ok(())
//!     }
//! }
//!
//! # async fn demo() -> QueueResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let queue = JobQueue::new(store, "tasks");
//! queue.enqueue(&serde_json::json!({ "task_id": 42 })).await?;
//!
//! let processor = Processor::new(queue, Arc::new(PrintHandler));
//! let cancel = CancellationToken::new();
//! // Blocks until stop() is called or `cancel` fires.
//! processor.run(cancel, 4).await?;
//! # Ok(())
//! # }
//! ```
//!
//! For a durable queue shared across processes, enable the `redis` feature
//! and swap `MemoryStore` for [`RedisStore`](store::redis::RedisStore); the
//! rest of the wiring is unchanged.

pub mod config;
pub mod error;
pub mod handler;
pub mod observability;
pub mod processor;
pub mod queue;
pub mod store;

// Core API exports
pub use config::ProcessorConfig;
pub use error::{HandlerError, QueueError, QueueResult};
pub use handler::JobHandler;
pub use processor::Processor;
pub use queue::JobQueue;
pub use store::QueueStore;

// Observability exports
pub use observability::{EventSink, MemorySink, QueueEvent, TracingSink};

// Store implementations
#[cfg(feature = "memory")]
pub use store::memory::MemoryStore;

#[cfg(feature = "redis")]
pub use store::redis::RedisStore;

/// Prelude for wiring up a queue, handler, and processor
pub mod prelude {
    pub use crate::{
        EventSink, HandlerError, JobHandler, JobQueue, Processor, ProcessorConfig, QueueError,
        QueueResult, QueueStore,
    };

    #[cfg(feature = "memory")]
    pub use crate::MemoryStore;

    #[cfg(feature = "redis")]
    pub use crate::RedisStore;

    // Essential traits
    pub use async_trait::async_trait;
}
