//! Retry logic for store calls.
//!
//! Exponential backoff with jitter for transient store errors.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::StoreError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retries before giving up.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    pub max_backoff_ms: u64,
    /// Whether to add jitter to backoff times.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff in milliseconds.
    pub fn with_initial_backoff_ms(mut self, initial_backoff_ms: u64) -> Self {
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    /// Set the maximum backoff in milliseconds.
    pub fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the backoff duration for a given attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base_ms = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_ms = base_ms.min(self.max_backoff_ms);

        let final_ms = if self.jitter {
            let jitter_range = capped_ms / 4; // 25% jitter
            let jitter = rand::rng().random_range(0..=jitter_range);
            capped_ms.saturating_add(jitter)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }
}

/// Error classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// The error is transient and can be retried.
    Retryable,
    /// The error is permanent and should not be retried.
    NonRetryable,
}

/// Classify a backend error message for retry purposes.
///
/// Retryable: 5xx, SlowDown, TooManyRequests, throttling, timeouts and
/// connection failures. Non-retryable: 4xx other than throttling,
/// AccessDenied, NoSuchBucket, InvalidRequest, signature problems.
pub fn classify_error(error: &str) -> ErrorClassification {
    let error_lower = error.to_lowercase();

    if error_lower.contains("slowdown")
        || error_lower.contains("toomanyrequests")
        || error_lower.contains("too many requests")
        || error_lower.contains("throttl")
        || error_lower.contains("service unavailable")
        || error_lower.contains("500")
        || error_lower.contains("502")
        || error_lower.contains("503")
        || error_lower.contains("504")
        || error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection reset")
        || error_lower.contains("connection refused")
        || error_lower.contains("dispatch failure")
    {
        return ErrorClassification::Retryable;
    }

    if error_lower.contains("accessdenied")
        || error_lower.contains("access denied")
        || error_lower.contains("invalidaccesskeyid")
        || error_lower.contains("signaturedoesnotmatch")
        || error_lower.contains("invalidrequest")
        || error_lower.contains("nosuchbucket")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("400")
    {
        return ErrorClassification::NonRetryable;
    }

    // Unknown failures are assumed transient
    ErrorClassification::Retryable
}

/// Execute a store call with retry logic.
///
/// Non-retryable errors are returned immediately; retryable ones are retried
/// up to `config.max_retries` times with backoff. The last error is returned
/// once retries are exhausted.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    with_retry_cancellable(config, operation_name, &CancellationToken::new(), operation).await
}

/// Like [`with_retry`], but no new attempt starts once `cancel` fires.
///
/// A backoff sleep is cut short by cancellation. An attempt already running
/// is awaited and its outcome discarded in favour of [`StoreError::Cancelled`].
pub async fn with_retry_cancellable<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            debug!(operation = operation_name, attempt = attempt, "Store call cancelled");
            return Err(StoreError::Cancelled);
        }

        let outcome = operation().await;
        if cancel.is_cancelled() && outcome.is_err() {
            return Err(StoreError::Cancelled);
        }

        match outcome {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => {
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    "Non-retryable store error"
                );
                return Err(e);
            }
            Err(e) if attempt >= config.max_retries => {
                warn!(
                    operation = operation_name,
                    attempts = attempt + 1,
                    error = %e,
                    "Store call failed after retries"
                );
                return Err(e);
            }
            Err(e) => {
                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %e,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retryable store error, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(StoreError::Cancelled),
                    _ = sleep(backoff) => {}
                }
                attempt += 1;
            }
        }
    }
}
