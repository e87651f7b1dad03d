use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for queue and processor operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Processor is already running")]
    AlreadyRunning,

    #[error("Processor has stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Handler execution outcome - a descriptive failure reported by a [`JobHandler`].
///
/// There is no retryable/permanent split: the queue never retries, so a failed
/// job is logged and dropped regardless of the reason.
///
/// [`JobHandler`]: crate::handler::JobHandler
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// Create a handler error from any displayable reason
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self(format!("payload decode failed: {err}"))
    }
}
