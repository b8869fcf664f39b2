//! Loader decorators
//!
//! Wrap any [`PageLoader`] to impose a deadline or a request rate. Both
//! failures surface as ordinary adapter errors.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::types::PageLoader;
use crate::error::{Error, Result};
use crate::types::{PageRequest, PageResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Timeout
// ============================================================================

/// Fails a page load that takes longer than `timeout`
#[derive(Debug, Clone)]
pub struct TimeoutLoader<L> {
    inner: L,
    timeout: Duration,
}

impl<L> TimeoutLoader<L> {
    /// Wrap a loader with a per-call deadline
    pub fn new(inner: L, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<T, L> PageLoader<T> for TimeoutLoader<L>
where
    T: Send + 'static,
    L: PageLoader<T>,
{
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>> {
        match tokio::time::timeout(self.timeout, self.inner.load_page(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{request} timed out after {:?}", self.timeout);
                Err(Error::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}

// ============================================================================
// Rate Limit
// ============================================================================

/// Waits for a rate limiter permit before each page load
#[derive(Debug, Clone)]
pub struct RateLimitedLoader<L> {
    inner: L,
    limiter: RateLimiter,
}

impl<L> RateLimitedLoader<L> {
    /// Wrap a loader with a token bucket
    pub fn new(inner: L, config: &RateLimiterConfig) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(config),
        }
    }

    /// Wrap a loader sharing an existing limiter
    pub fn with_limiter(inner: L, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<T, L> PageLoader<T> for RateLimitedLoader<L>
where
    T: Send + 'static,
    L: PageLoader<T>,
{
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>> {
        if !self.limiter.try_acquire() {
            debug!("Throttling {request}");
            self.limiter.wait().await;
        }
        self.inner.load_page(request).await
    }
}
