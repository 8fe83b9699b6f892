use crate::config::RetryConfig;
use crate::recognition::RecognitionConfig;
use std::sync::Arc;
use std::time::Duration;

/// Configuration shared by every streaming session
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Request sent on every stream open (static per process)
    pub recognition: Arc<RecognitionConfig>,

    /// Reconnect schedule after upstream failures
    pub retry: RetryPolicy,
}

/// Exponential reconnect schedule
///
/// Attempt `n` waits `base_delay * 2^n`; attempts at or beyond `max_retries`
/// are not scheduled. Defaults give 1s, 2s, 4s, 8s, 16s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before reconnect attempt `attempt` (0-based), or `None` when exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        let factor = 2u32.checked_pow(attempt)?;
        self.base_delay.checked_mul(factor)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay(),
        }
    }
}
