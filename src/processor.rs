use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ProcessorConfig;
use crate::handler::JobHandler;
use crate::observability::{EventSink, QueueEvent};
use crate::queue::JobQueue;
use crate::store::QueueStore;
use crate::{QueueError, QueueResult};

/// Pool lifecycle. One-way: a stopped processor is not restartable; construct
/// a new one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessorState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Fixed-size worker pool draining one [`JobQueue`] into a [`JobHandler`].
///
/// Each worker independently repeats one cycle: race a blocking dequeue
/// against the stop signal and the cancellation token, dispatch any returned
/// item to the handler exactly once, and discard the result. Handler errors
/// drop the job permanently; store errors are transient and the worker
/// proceeds to its next cycle. Shutdown is cooperative: [`stop`] and token
/// cancellation both halt intake, but an in-flight handler call always runs
/// to completion, so the pool stops within one unit of work plus at most one
/// dequeue timeout per worker.
///
/// [`stop`]: Processor::stop
pub struct Processor<S: QueueStore + 'static> {
    queue: JobQueue<S>,
    handler: Arc<dyn JobHandler>,
    config: ProcessorConfig,
    state: Mutex<ProcessorState>,
    shutdown: watch::Sender<bool>,
}

impl<S: QueueStore + 'static> Processor<S> {
    /// Create a processor draining `queue` into `handler`
    pub fn new(queue: JobQueue<S>, handler: Arc<dyn JobHandler>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue,
            handler,
            config: ProcessorConfig::default(),
            state: Mutex::new(ProcessorState::Created),
            shutdown,
        }
    }

    /// Create the processor with custom configuration
    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the worker pool until [`stop`] is called or `cancel` fires.
    ///
    /// Spawns `max(1, concurrency)` workers and blocks the caller until every
    /// worker loop has exited, at which point the pool is stopped for good.
    /// A second call while the pool is running returns
    /// [`QueueError::AlreadyRunning`] instead of spawning a duplicate,
    /// uncoordinated pool; a call after a full stop returns
    /// [`QueueError::AlreadyStopped`].
    ///
    /// [`stop`]: Processor::stop
    #[instrument(skip(self, cancel), fields(queue = %self.queue.name()))]
    pub async fn run(&self, cancel: CancellationToken, concurrency: usize) -> QueueResult<()> {
        {
            let mut state = self.state.lock();
            match *state {
                ProcessorState::Created => *state = ProcessorState::Running,
                ProcessorState::Running | ProcessorState::Stopping => {
                    return Err(QueueError::AlreadyRunning)
                }
                ProcessorState::Stopped => return Err(QueueError::AlreadyStopped),
            }
        }

        let workers = concurrency.max(1);
        info!(workers, "processor starting");

        let mut joins: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let worker = WorkerContext {
                worker_id,
                queue: self.queue.clone(),
                handler: Arc::clone(&self.handler),
                events: self.queue.events(),
                cancel: cancel.clone(),
                shutdown_rx: self.shutdown.subscribe(),
                dequeue_timeout: self.config.dequeue_timeout,
            };
            joins.push(tokio::spawn(worker.run()));
        }

        let mut first_join_error = None;
        for join in joins {
            if let Err(e) = join.await {
                error!(error = %e, "worker task join failed");
                first_join_error
                    .get_or_insert_with(|| QueueError::Internal(format!("worker join error: {e}")));
            }
        }

        *self.state.lock() = ProcessorState::Stopped;
        info!("processor stopped");

        match first_join_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Raise the pool-wide stop signal. Non-blocking and idempotent: safe to
    /// call repeatedly or from several tasks at once; only the first call
    /// transitions the pool. Does not interrupt a handler call already in
    /// progress.
    pub fn stop(&self) {
        {
            let mut state = self.state.lock();
            if *state == ProcessorState::Running {
                *state = ProcessorState::Stopping;
            }
        }
        // Receivers may all have exited already.
        let _ = self.shutdown.send(true);
    }

    /// Whether the pool is currently running workers
    pub fn is_running(&self) -> bool {
        matches!(
            *self.state.lock(),
            ProcessorState::Running | ProcessorState::Stopping
        )
    }
}

/// Everything one worker loop owns
struct WorkerContext<S: QueueStore + 'static> {
    worker_id: usize,
    queue: JobQueue<S>,
    handler: Arc<dyn JobHandler>,
    events: Arc<dyn EventSink>,
    cancel: CancellationToken,
    shutdown_rx: watch::Receiver<bool>,
    dequeue_timeout: Duration,
}

impl<S: QueueStore + 'static> WorkerContext<S> {
    async fn run(mut self) {
        let worker = self.worker_id;
        self.events.emit(QueueEvent::WorkerStarted {
            worker,
            at: Utc::now(),
        });
        debug!(worker, "worker loop entered");

        loop {
            if *self.shutdown_rx.borrow() || self.cancel.is_cancelled() {
                break;
            }

            // Race one dequeue cycle against both shutdown triggers so an
            // idle worker reacts immediately instead of draining its timeout.
            let popped = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => continue,
                _ = self.cancel.cancelled() => continue,
                popped = self.queue.dequeue(self.dequeue_timeout) => popped,
            };

            let payload = match popped {
                Ok(Some(payload)) => payload,
                // Idle timeout: a normal outcome, back to the stop check.
                Ok(None) => continue,
                Err(e) => {
                    warn!(worker, error = %e, "dequeue failed, retrying next cycle");
                    self.events.emit(QueueEvent::StoreError {
                        queue: self.queue.name().to_string(),
                        operation: "dequeue".to_string(),
                        error: e.to_string(),
                        at: Utc::now(),
                    });
                    continue;
                }
            };

            self.dispatch(payload).await;
        }

        self.events.emit(QueueEvent::WorkerStopped {
            worker,
            at: Utc::now(),
        });
        debug!(worker, "worker loop exited");
    }

    /// Invoke the handler exactly once and discard the job whatever happens.
    /// A panicking handler is contained here so it cannot take the worker
    /// loop down with it.
    async fn dispatch(&self, payload: Vec<u8>) {
        let worker = self.worker_id;
        let outcome = AssertUnwindSafe(self.handler.handle(self.cancel.clone(), &payload))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                self.events.emit(QueueEvent::HandlerSucceeded {
                    queue: self.queue.name().to_string(),
                    worker,
                    at: Utc::now(),
                });
            }
            Ok(Err(e)) => {
                error!(worker, error = %e, "handler failed, job dropped");
                self.events.emit(QueueEvent::HandlerFailed {
                    queue: self.queue.name().to_string(),
                    worker,
                    error: e.to_string(),
                    at: Utc::now(),
                });
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked".to_string());
                error!(worker, reason = %reason, "handler panicked, job dropped");
                self.events.emit(QueueEvent::HandlerFailed {
                    queue: self.queue.name().to_string(),
                    worker,
                    error: reason,
                    at: Utc::now(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;

    struct NoopHandler;

    #[async_trait]
    impl JobHandler for NoopHandler {
        async fn handle(
            &self,
            _cancel: CancellationToken,
            _payload: &[u8],
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn test_processor() -> Processor<MemoryStore> {
        let queue = JobQueue::new(Arc::new(MemoryStore::new()), "default");
        Processor::new(queue, Arc::new(NoopHandler)).with_config(ProcessorConfig {
            dequeue_timeout: Duration::from_millis(50),
        })
    }

    #[tokio::test]
    async fn stop_before_run_makes_run_return_promptly() {
        let processor = test_processor();
        processor.stop();
        let cancel = CancellationToken::new();
        processor.run(cancel, 2).await.unwrap();
        assert!(!processor.is_running());
    }

    #[tokio::test]
    async fn run_after_stop_is_rejected() {
        let processor = test_processor();
        processor.stop();
        processor.run(CancellationToken::new(), 1).await.unwrap();

        let again = processor.run(CancellationToken::new(), 1).await;
        assert!(matches!(again, Err(QueueError::AlreadyStopped)));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let processor = test_processor();
        processor.stop();
        processor.stop();
        processor.stop();
        processor.run(CancellationToken::new(), 1).await.unwrap();
    }

    #[tokio::test]
    async fn zero_concurrency_still_spawns_one_worker() {
        let processor = Arc::new(test_processor());
        let cancel = CancellationToken::new();

        let run = {
            let processor = Arc::clone(&processor);
            let cancel = cancel.clone();
            tokio::spawn(async move { processor.run(cancel, 0).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(processor.is_running());
        cancel.cancel();
        run.await.unwrap().unwrap();
    }
}
