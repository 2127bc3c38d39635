//! Timeout, backoff and bounded retries around one outbound call.

use crate::error::{AuthError, Result};
use crate::rate_window::RateWindow;
use core_runtime::config::RefreshPolicy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retries an operation with exponential backoff.
///
/// Every error is retryable, timeouts and HTTP 429 included. Once the budget
/// is spent the last error is returned unchanged. When a [`RateWindow`] is
/// attached, each attempt first takes a slot in it, outside the per-call
/// timeout, so throttling delays never count as a timeout.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    call_timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    rate_window: Option<Arc<RateWindow>>,
}

impl RetryExecutor {
    pub fn new(call_timeout: Duration, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            call_timeout,
            max_retries,
            base_delay,
            rate_window: None,
        }
    }

    pub fn from_policy(policy: &RefreshPolicy) -> Self {
        Self::new(policy.call_timeout, policy.max_retries, policy.base_delay)
    }

    pub fn with_rate_window(mut self, rate_window: Arc<RateWindow>) -> Self {
        self.rate_window = Some(rate_window);
        self
    }

    /// Backoff before retry number `attempt + 1`: `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `operation` until it succeeds or the retry budget is exhausted.
    ///
    /// The closure receives the zero-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;

        loop {
            if let Some(rate_window) = &self.rate_window {
                rate_window.acquire().await;
            }

            let outcome = match timeout(self.call_timeout, operation(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AuthError::Timeout(format!(
                    "no response within {}ms",
                    self.call_timeout.as_millis()
                ))),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if attempt >= self.max_retries {
                warn!(
                    attempts = attempt + 1,
                    kind = %error.kind(),
                    "Retry budget exhausted"
                );
                return Err(error);
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Call failed, retrying"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
