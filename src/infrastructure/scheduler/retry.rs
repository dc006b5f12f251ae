//! Retry with exponential backoff for scheduled operations.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;
use crate::infrastructure::config::scheduler::RetryConfig;

/// Add up to 20% random jitter so retries across models do not align.
fn with_jitter(base: Duration) -> Duration {
    let range_ms = u64::try_from(base.as_millis() / 5).unwrap_or(u64::MAX);
    if range_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=range_ms))
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Returns the last error in the latter cases.
///
/// # Errors
/// The final error from `op`.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryConfig, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= max_attempts => {
                warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = with_jitter(policy.delay_after(attempt));
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                sleep(delay).await;
            }
        }
    }
}
