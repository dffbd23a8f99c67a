//! Retry wrapper for generators: bounded retries with backoff and jitter

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;

use super::types::{Generated, Generator, ResponseKind};

/// Wraps a [`Generator`] and retries transient failures
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    /// Extra attempts after the first one
    max_retries: u32,
    /// Base delay for exponential backoff
    base_retry_delay: Duration,
}

impl RetryingGenerator {
    /// Wrap a generator with a single retry
    pub fn new(inner: Arc<dyn Generator>) -> Self {
        Self {
            inner,
            max_retries: 1,
            base_retry_delay: Duration::from_millis(500),
        }
    }

    /// Set the number of retries after the first attempt
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base retry delay for exponential backoff
    pub fn with_base_retry_delay(mut self, delay: Duration) -> Self {
        self.base_retry_delay = delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_retry_delay * 2u32.saturating_pow(attempt);
        let jitter_cap = (base.as_millis() as u64 / 4).max(1);
        let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
        base + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn generate(&self, prompt: &str, kind: ResponseKind) -> Result<Generated> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt, kind).await {
                Ok(generated) => return Ok(generated),
                Err(e) => {
                    let retryable = is_retryable_error(&e.to_string());
                    warn!(
                        "Generator {} ({}) failed (attempt {}, retryable={}): {}",
                        self.inner.provider_name(),
                        self.inner.model(),
                        attempt + 1,
                        retryable,
                        e,
                    );
                    if !retryable || attempt >= self.max_retries {
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    debug!("Backing off for {:?} before retry", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Determine if an error is retryable (rate limit, server error, timeout)
fn is_retryable_error(err: &str) -> bool {
    let retryable_patterns = [
        "429",
        "500",
        "502",
        "503",
        "504",
        "rate limit",
        "resource_exhausted",
        "overloaded",
        "timeout",
        "timed out",
        "connection reset",
        "connection refused",
        "temporarily unavailable",
    ];
    let lower = err.to_lowercase();
    retryable_patterns.iter().any(|p| lower.contains(p))
}
