//! Opt-in retry for uploads.
//!
//! Storage operations fail fast. A caller that can afford to wait wraps an
//! upload in [`UploadRetry::run`]; only failures for which
//! [`UploadError::is_retryable`] holds are repeated, so a bad argument or a
//! broken configuration is returned immediately.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use showcase_common::UploadError;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Retry budget and backoff for one upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadRetry {
    retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl UploadRetry {
    /// Allow up to `retries` repeats after the first attempt.
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Wait before retry number `retry` (1-based).
    ///
    /// The ceiling doubles from the base delay up to the maximum; the wait is
    /// drawn from the upper half of it.
    fn backoff(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay
            .saturating_mul(1 << doublings)
            .min(self.max_delay);
        let half = ceiling / 2;

        half + half.mul_f64(rand::random::<f64>())
    }

    /// Run `upload`, repeating it while it fails transiently and the budget
    /// lasts. The last error is returned once the budget is spent.
    pub async fn run<T, F, Fut>(&self, mut upload: F) -> Result<T, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut retry = 0;

        loop {
            match upload().await {
                Err(err) if err.is_retryable() && retry < self.retries => {
                    retry += 1;
                    let delay = self.backoff(retry);
                    warn!(
                        retry,
                        max_retries = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Upload failed transiently, retrying"
                    );
                    sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}
