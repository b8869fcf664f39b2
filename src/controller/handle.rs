//! Handles handed to rendering code

use super::core::{Controller, Inner};
use crate::projector::Snapshot;
use std::sync::Weak;

/// Snapshot plus the retry action, as consumed by rendering code
#[derive(Debug, Clone)]
pub struct PublicState<T> {
    /// State at the time of the call
    pub snapshot: Snapshot<T>,
    /// Re-issues the failed request
    pub retry: RetryHandle<T>,
}

/// Retry action detached from the controller's lifetime
///
/// Holding one does not keep the controller alive; after it is dropped or
/// unmounted, `retry` does nothing.
pub struct RetryHandle<T> {
    controller: WeakController<T>,
}

impl<T> RetryHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(super) fn new(controller: WeakController<T>) -> Self {
        Self { controller }
    }

    /// Re-issue the failed request, returning whether one was issued
    pub fn retry(&self) -> bool {
        self.controller
            .upgrade()
            .is_some_and(|controller| controller.retry())
    }
}

impl<T> Clone for RetryHandle<T> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

impl<T> std::fmt::Debug for RetryHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryHandle").finish_non_exhaustive()
    }
}

/// Non-owning controller reference used by background tasks
pub struct WeakController<T> {
    pub(super) inner: Weak<Inner<T>>,
}

impl<T> WeakController<T> {
    /// Get the controller back if it is still alive
    pub fn upgrade(&self) -> Option<Controller<T>> {
        self.inner.upgrade().map(|inner| Controller { inner })
    }
}

impl<T> Clone for WeakController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for WeakController<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakController")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}
