//! Retry-with-backoff as a wrapping policy.
//!
//! The core pipeline never retries: a fetcher does one request, and a failed
//! page is contained by the scheduler. When retries are wanted they are
//! layered on at the [`PageSource`] boundary with [`RetryingSource`], keeping
//! the policy out of the core logic.
//!
//! # Example
//!
//! ```rust,no_run
//! use patient_replicator::config::SourceConfig;
//! use patient_replicator::fetch::HttpPageSource;
//! use patient_replicator::resilience::{RetryConfig, RetryingSource};
//!
//! let source = HttpPageSource::new(&SourceConfig::default()).unwrap();
//! let source = RetryingSource::new(source, RetryConfig::default());
//! # let _ = source;
//! ```

use crate::fetch::{BoxFuture, PageSource};
use crate::record::Page;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per page (including the first).
    pub max_attempts: usize,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (ceiling for exponential backoff).
    pub max_delay: Duration,

    /// Backoff multiplier (e.g. 2.0 = double the delay each retry).
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Fast-fail retry for tests.
    pub fn testing() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_factor: 2.0,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_factor;
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// A [`PageSource`] decorator that retries retryable fetch errors with
/// exponential backoff. Non-retryable errors propagate immediately.
pub struct RetryingSource<S: PageSource> {
    inner: S,
    config: RetryConfig,
}

impl<S: PageSource> RetryingSource<S> {
    /// Wrap `inner` with the given retry policy.
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

impl<S: PageSource> PageSource for RetryingSource<S> {
    fn fetch_page(&self, offset: u64) -> BoxFuture<'_, Page> {
        Box::pin(async move {
            let mut attempts = 0;
            let mut delay = self.config.initial_delay;

            loop {
                attempts += 1;
                match self.inner.fetch_page(offset).await {
                    Ok(page) => {
                        if attempts > 1 {
                            debug!(offset, attempts, "Fetch succeeded after retry");
                        }
                        return Ok(page);
                    }
                    Err(e) if e.is_retryable() && attempts < self.config.max_attempts => {
                        warn!(
                            offset,
                            attempts,
                            max_attempts = self.config.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        delay = self.config.next_delay(delay);
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }

    fn page_size(&self) -> u64 {
        self.inner.page_size()
    }
}
