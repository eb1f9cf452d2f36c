use std::time::Duration;

use crate::error::AppError;

/// Default number of concurrently running item tasks per batch.
pub const DEFAULT_WORKERS: usize = 10;

/// Default deadline for one outbound inventory call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry for retryable inventory errors.
///
/// Applied inside the item applier, before the single status write.
/// The default of one attempt disables retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Base delay, doubled after each failed attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay before attempt `attempt` (1-based). No delay before the first.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2).min(16);
        self.backoff.saturating_mul(1 << exp)
    }
}

// =============================================================================
// Processor Configuration
// =============================================================================

/// Bulk processor configuration.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum number of items applied concurrently.
    pub workers: usize,
    /// Deadline for each outbound inventory call.
    pub call_timeout: Duration,
    /// Retry policy for retryable inventory errors.
    pub retry: RetryPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ProcessorConfig {
    /// Set the worker count. Zero is clamped to one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Rejects values the processor cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::ConfigError(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "call timeout must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::ConfigError(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
