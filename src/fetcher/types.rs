//! Page loader trait and closure adapter

use crate::error::Result;
use crate::types::{PageRequest, PageResult};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Loads one page of items for the controller
///
/// Implementations may fail or take arbitrarily long. The controller never
/// calls `load_page` again before the previous call has resolved.
#[async_trait]
pub trait PageLoader<T>: Send + Sync {
    /// Fetch the page described by `request`
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>>;
}

#[async_trait]
impl<T, L> PageLoader<T> for Arc<L>
where
    T: Send + 'static,
    L: PageLoader<T> + ?Sized,
{
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>> {
        (**self).load_page(request).await
    }
}

/// Page loader backed by an async closure
pub struct FnLoader<F> {
    f: F,
}

impl<F> FnLoader<F> {
    /// Wrap a closure returning a page future
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> PageLoader<T> for FnLoader<F>
where
    T: Send + 'static,
    F: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResult<T>>> + Send + 'static,
{
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>> {
        (self.f)(request).await
    }
}

impl<F> std::fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

/// Build a page loader from an async closure
///
/// ```rust,ignore
/// let loader = loader_fn(|req: PageRequest| async move {
///     Ok(PageResult::new(fetch(req.offset, req.limit).await?, 1302))
/// });
/// ```
pub fn loader_fn<F>(f: F) -> FnLoader<F> {
    FnLoader::new(f)
}
