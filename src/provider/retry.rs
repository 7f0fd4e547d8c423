//! Retry adapter for annotation providers.

use super::{AnnotationProvider, ProviderError};
use crate::models::AnnotationResponse;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// Number of extra attempts made for a failed call.
pub const MAX_RETRIES: u32 = 1;

/// Wraps a provider so each call is retried at most once.
///
/// Validation failures are returned immediately. The adapter also records
/// whether the most recent call ended in failure.
pub struct Retrying<P> {
    inner: P,
    delay: Duration,
    last_failed: AtomicBool,
}

impl<P: AnnotationProvider> Retrying<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            delay: Duration::from_secs(1),
            last_failed: AtomicBool::new(false),
        }
    }

    /// Override the pause before the retry.
    #[cfg(test)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[cfg(test)]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// True when the most recent call failed after retrying.
    pub fn last_call_failed(&self) -> bool {
        self.last_failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P: AnnotationProvider> AnnotationProvider for Retrying<P> {
    async fn annotate(&self, text: &str) -> Result<AnnotationResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            match self.inner.annotate(text).await {
                Ok(response) => {
                    self.last_failed.store(false, Ordering::SeqCst);
                    return Ok(response);
                }
                Err(e) if attempt < MAX_RETRIES && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        "{} call failed ({}), retrying ({}/{})",
                        self.inner.name(),
                        e,
                        attempt,
                        MAX_RETRIES
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(e) => {
                    self.last_failed.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
