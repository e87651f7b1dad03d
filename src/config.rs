use std::time::Duration;

/// Configuration for the job processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// How long one dequeue cycle blocks before returning empty.
    ///
    /// This also bounds shutdown latency: an idle worker re-checks the stop
    /// signal at least once per interval, so the pool stops within one unit of
    /// in-flight work plus one timeout.
    pub dequeue_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            dequeue_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dequeue_timeout_is_five_seconds() {
        let config = ProcessorConfig::default();
        assert_eq!(config.dequeue_timeout, Duration::from_secs(5));
    }
}
