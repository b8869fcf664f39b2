//! Controller implementation
//!
//! Owns the pagination state behind a mutex that is never held across an
//! await. Page loads run on spawned tasks holding only a weak reference to
//! the controller, so a load that settles after unmount (or after every
//! handle is dropped) cannot touch state.

use super::handle::{PublicState, RetryHandle, WeakController};
use crate::auto_advance;
use crate::config::PagerConfig;
use crate::error::{Error, ErrorInfo, Result};
use crate::fetcher::PageLoader;
use crate::pagination::{Completion, InFlight, PaginationState, Seed};
use crate::projector::{self, DebugView, Snapshot};
use crate::types::PageResult;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a mounted pagination controller
///
/// Cloning is cheap; all clones drive the same state.
pub struct Controller<T> {
    pub(super) inner: Arc<Inner<T>>,
}

pub(super) struct Inner<T> {
    config: PagerConfig,
    loader: Arc<dyn PageLoader<T>>,
    state: Mutex<PaginationState<T>>,
    snapshot_tx: watch::Sender<Snapshot<T>>,
    runtime: Handle,
    mounted: AtomicBool,
    load_calls: AtomicU64,
    fetch_task: Mutex<Option<JoinHandle<()>>>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

/// Builder for [`Controller`]
pub struct ControllerBuilder<T> {
    loader: Arc<dyn PageLoader<T>>,
    config: PagerConfig,
    seed: Option<Seed<T>>,
}

impl<T> ControllerBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Set the controller config
    #[must_use]
    pub fn config(mut self, config: PagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Warm-start from pre-fetched items
    #[must_use]
    pub fn seed(mut self, seed: Seed<T>) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the config and mount the controller
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(self) -> Result<Controller<T>> {
        self.config.validate()?;

        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("Controller requires a Tokio runtime: {e}")))?;

        let state = match self.seed {
            Some(seed) => PaginationState::with_seed(&self.config, seed),
            None => PaginationState::new(&self.config),
        };
        let (snapshot_tx, _) = watch::channel(projector::project(&state, self.config.debug));

        let controller = Controller {
            inner: Arc::new(Inner {
                config: self.config,
                loader: self.loader,
                state: Mutex::new(state),
                snapshot_tx,
                runtime,
                mounted: AtomicBool::new(true),
                load_calls: AtomicU64::new(0),
                fetch_task: Mutex::new(None),
                auto_task: Mutex::new(None),
            }),
        };

        info!(
            "Mounted controller: page_size={}, auto_advance={}, status={}",
            controller.inner.config.page_size,
            controller.inner.config.auto_advance,
            controller.status_label()
        );

        controller.ensure_auto_advance();
        Ok(controller)
    }
}

impl<T> Controller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building a controller around a page loader
    pub fn builder(loader: impl PageLoader<T> + 'static) -> ControllerBuilder<T> {
        Self::builder_shared(Arc::new(loader))
    }

    /// Start building a controller around a shared page loader
    pub fn builder_shared(loader: Arc<dyn PageLoader<T>>) -> ControllerBuilder<T> {
        ControllerBuilder {
            loader,
            config: PagerConfig::default(),
            seed: None,
        }
    }

    /// Mount a controller with a config and no seed
    pub fn mount(config: PagerConfig, loader: impl PageLoader<T> + 'static) -> Result<Self> {
        Self::builder(loader).config(config).mount()
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    /// Request the next page
    ///
    /// Returns whether a request was issued. A no-op while loading, once
    /// exhausted, or after unmount.
    pub fn request_next_page(&self) -> bool {
        if !self.is_mounted() {
            debug!("Ignoring next-page request on unmounted controller");
            return false;
        }

        let issued = self.issue(PaginationState::begin_next);
        match issued {
            Some(in_flight) => {
                self.spawn_fetch(in_flight);
                true
            }
            None => false,
        }
    }

    /// Re-issue the request that just failed
    ///
    /// Returns whether a request was issued. A no-op unless in the error state.
    pub fn retry(&self) -> bool {
        if !self.is_mounted() {
            debug!("Ignoring retry on unmounted controller");
            return false;
        }

        let issued = self.issue(PaginationState::begin_retry);
        match issued {
            Some(in_flight) => {
                info!("Retrying {}", in_flight.request);
                self.spawn_fetch(in_flight);
                true
            }
            None => false,
        }
    }

    /// Clear all state, optionally warm-starting from a seed
    ///
    /// An in-flight request is abandoned and its result discarded.
    pub fn reset(&self, seed: Option<Seed<T>>) {
        if !self.is_mounted() {
            debug!("Ignoring reset on unmounted controller");
            return;
        }

        self.abort_fetch();
        self.transition(|state| state.reset(seed));
        info!("Controller reset, status={}", self.status_label());
        self.ensure_auto_advance();
    }

    /// Tear the controller down
    ///
    /// Background tasks stop and any in-flight result is discarded. All
    /// later triggers are no-ops.
    pub fn unmount(&self) {
        // Flipped under the state lock so no request can be issued after it
        let abandoned = {
            let mut state = lock(&self.inner.state);
            if !self.inner.mounted.swap(false, Ordering::SeqCst) {
                return;
            }
            let abandoned = state.abandon();
            self.inner.publish(&state);
            abandoned
        };

        self.abort_fetch();
        if let Some(task) = lock(&self.inner.auto_task).take() {
            task.abort();
        }
        if let Some(abandoned) = abandoned {
            info!("Unmounted with {} in flight, result will be discarded", abandoned.request);
        } else {
            info!("Unmounted");
        }
    }

    /// Check if the controller is still mounted
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    // ========================================================================
    // State Access
    // ========================================================================

    /// Current snapshot
    pub fn snapshot(&self) -> Snapshot<T> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshots published after every transition
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Snapshot bundled with a retry handle for rendering code
    pub fn public_state(&self) -> PublicState<T> {
        PublicState {
            snapshot: self.snapshot(),
            retry: RetryHandle::new(self.downgrade()),
        }
    }

    /// Introspection view (None unless debug is enabled)
    pub fn debug_view(&self) -> Option<DebugView> {
        if self.inner.config.debug {
            Some(projector::debug_view(&*lock(&self.inner.state)))
        } else {
            None
        }
    }

    /// Config this controller was mounted with
    pub fn config(&self) -> &PagerConfig {
        &self.inner.config
    }

    /// Number of page loader invocations so far
    pub fn load_calls(&self) -> u64 {
        self.inner.load_calls.load(Ordering::SeqCst)
    }

    /// Wait until no request is in flight
    pub async fn settled(&self) -> Snapshot<T> {
        self.wait_for(|s| !s.loading).await
    }

    /// Wait until a snapshot satisfies `predicate`
    pub async fn wait_for(&self, mut predicate: impl FnMut(&Snapshot<T>) -> bool) -> Snapshot<T> {
        let mut rx = self.subscribe();
        let snapshot = match rx.wait_for(|s| predicate(s)).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives as long as `self`
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Weak handle that does not keep the controller alive
    pub fn downgrade(&self) -> WeakController<T> {
        WeakController {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run a transition and publish the new snapshot under the same lock
    fn transition<R>(&self, f: impl FnOnce(&mut PaginationState<T>) -> R) -> R {
        let mut state = lock(&self.inner.state);
        let result = f(&mut *state);
        self.inner.publish(&state);
        result
    }

    /// Like `transition`, but a no-op leaves subscribers unwoken
    ///
    /// Never issues once unmounted; the mounted flag is read under the lock.
    fn issue(
        &self,
        begin: impl FnOnce(&mut PaginationState<T>) -> Option<InFlight>,
    ) -> Option<InFlight> {
        let mut state = lock(&self.inner.state);
        if !self.is_mounted() {
            return None;
        }
        let issued = begin(&mut *state);
        if issued.is_some() {
            self.inner.publish(&state);
        }
        issued
    }

    fn spawn_fetch(&self, in_flight: InFlight) {
        let weak = Arc::downgrade(&self.inner);
        let loader = Arc::clone(&self.inner.loader);
        self.inner.load_calls.fetch_add(1, Ordering::SeqCst);

        let task = self.inner.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(loader.load_page(in_flight.request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::Other("page loader panicked".to_string())));

            match weak.upgrade() {
                Some(inner) => inner.finish(in_flight, outcome),
                None => debug!(
                    "Controller dropped, discarding result of {}",
                    in_flight.request
                ),
            }
        });

        *lock(&self.inner.fetch_task) = Some(task);
    }

    fn abort_fetch(&self) {
        if let Some(task) = lock(&self.inner.fetch_task).take() {
            task.abort();
        }
    }

    fn ensure_auto_advance(&self) {
        if !self.inner.config.auto_advance || !self.is_mounted() {
            return;
        }

        let mut slot = lock(&self.inner.auto_task);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *slot = Some(auto_advance::spawn_on(&self.inner.runtime, self));
    }

    fn status_label(&self) -> String {
        lock(&self.inner.state).status().to_string()
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn finish(&self, in_flight: InFlight, outcome: Result<PageResult<T>>) {
        if !self.mounted.load(Ordering::SeqCst) {
            debug!("Discarding result of {} after unmount", in_flight.request);
            return;
        }

        let outcome = outcome.map_err(|e| ErrorInfo::from(&e));
        let mut state = lock(&self.state);
        match state.complete(in_flight.id, outcome) {
            Completion::Applied { status, received } => {
                debug!(
                    "{} merged {received} items, fetched={}, status={status}",
                    in_flight.request,
                    state.fetched_count()
                );
                self.publish(&state);
            }
            Completion::Failed => self.publish(&state),
            Completion::Stale => {
                warn!("Discarded late result of {}", in_flight.request);
            }
        }
    }

    fn publish(&self, state: &PaginationState<T>) {
        self.snapshot_tx
            .send_replace(projector::project(state, self.config.debug));
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        for slot in [&mut self.fetch_task, &mut self.auto_task] {
            if let Some(task) = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
                task.abort();
            }
        }
    }
}

impl<T> Clone for Controller<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Controller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.inner.config)
            .field("mounted", &self.inner.mounted.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
