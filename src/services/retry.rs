//! Bounded retry with exponential backoff for embedding calls.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::errors::{EmbeddingError, EmbeddingResult};

/// Exponent cap: the delay never exceeds `base * 32`.
const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Retry policy applied to each sub-batch of a pipelined job.
///
/// Makes up to `max_retries + 1` attempts. Only retryable errors (provider
/// failures) trigger another attempt; anything else is returned as-is.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_backoff: Duration,
}

impl RetryPolicy {
    /// Policy allowing `max_retries` extra attempts.
    pub const fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    /// Extra attempts after the first.
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Execute an operation, retrying retryable failures.
    ///
    /// When the final attempt fails, the error is wrapped in
    /// [`EmbeddingError::RetriesExhausted`] with the number of attempts made.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> EmbeddingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EmbeddingResult<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) if !err.is_retryable() => {
                    debug!("Permanent error, not retrying: {}", err);
                    return Err(err);
                }
                Err(err) if attempt >= self.max_retries => {
                    warn!("Operation failed after {} attempts: {}", attempt + 1, err);
                    return Err(EmbeddingError::RetriesExhausted {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
                Err(err) => {
                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        "Attempt {} failed with transient error: {}. Retrying in {:?}...",
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delay after the failed attempt numbered `attempt` (0-based).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
    }
}
