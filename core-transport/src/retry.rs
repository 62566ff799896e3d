//! Fixed-delay retry loop for server-class failures.

use core_async::time::{sleep, Duration};
use std::future::Future;
use tracing::{debug, warn};

use crate::error::Result;

/// How many times to re-attempt and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error or
    /// the retries are used up. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut remaining = self.retries;
        let mut number = 1;

        loop {
            debug!(
                endpoint = label,
                attempt = number,
                max_attempts = self.max_attempts(),
                "Executing API request"
            );

            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && remaining > 0 => {
                    warn!(
                        endpoint = label,
                        attempt = number,
                        status = ?e.status(),
                        error = %e,
                        "API request failed with retryable status"
                    );
                    remaining -= 1;
                    number = number.saturating_add(1);
                    sleep(self.delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
