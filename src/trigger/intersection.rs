//! Sentinel-driven trigger
//!
//! Requests the next page whenever the sentinel is reported visible while
//! the controller is idle with more to load. Visibility events and snapshot
//! changes are handled on one task so a burst of events cannot race a
//! settling fetch.

use super::types::{VisibilityCallback, VisibilityEvent, VisibilitySource};
use crate::config::ObserverOptions;
use crate::controller::{Controller, WeakController};
use crate::error::{Error, Result};
use crate::projector::Snapshot;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Attaches a controller to a visibility source
pub struct IntersectionTrigger<T> {
    controller: WeakController<T>,
    source: Arc<dyn VisibilitySource>,
    events: mpsc::UnboundedSender<VisibilityEvent>,
    bias: f64,
    options: Mutex<ObserverOptions>,
    task: JoinHandle<()>,
}

impl<T> IntersectionTrigger<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start observing with the controller's configured options
    ///
    /// The configured bias is added to the bottom root margin.
    pub fn attach(controller: &Controller<T>, source: Arc<dyn VisibilitySource>) -> Result<Self> {
        if !controller.is_mounted() {
            return Err(Error::NotMounted);
        }
        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("Trigger requires a Tokio runtime: {e}")))?;

        let config = controller.config();
        let options = config.effective_observer();
        let (events, rx) = mpsc::unbounded_channel();

        source.observe(&options, forward_to(&events))?;
        info!(
            "Observing sentinel with root_margin=\"{}\", threshold={:?}",
            options.root_margin,
            options.threshold.ratios()
        );

        let task = runtime.spawn(run(
            controller.downgrade(),
            Arc::clone(&source),
            rx,
            controller.subscribe(),
        ));

        Ok(Self {
            controller: controller.downgrade(),
            source,
            events,
            bias: config.bias,
            options: Mutex::new(options),
            task,
        })
    }

    /// Re-create the observer with new options
    ///
    /// The bias configured on the controller still applies.
    pub fn reconfigure(&self, options: ObserverOptions) -> Result<()> {
        options.validate()?;
        let mut effective = options;
        effective.root_margin = effective.root_margin.extend_bottom(self.bias);

        let mut current = self.options.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == effective {
            debug!("Observer options unchanged");
            return Ok(());
        }

        self.source.unobserve();
        self.source.observe(&effective, forward_to(&self.events))?;
        info!("Observer re-created with root_margin=\"{}\"", effective.root_margin);
        *current = effective;
        Ok(())
    }

    /// Options the observer currently runs with
    pub fn options(&self) -> ObserverOptions {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check if the controller is still alive and mounted
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
            && self
                .controller
                .upgrade()
                .is_some_and(|controller| controller.is_mounted())
    }

    /// Stop observing
    pub fn detach(self) {}
}

impl<T> Drop for IntersectionTrigger<T> {
    fn drop(&mut self) {
        self.source.unobserve();
        self.task.abort();
    }
}

impl<T> std::fmt::Debug for IntersectionTrigger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntersectionTrigger")
            .field("bias", &self.bias)
            .finish_non_exhaustive()
    }
}

fn forward_to(events: &mpsc::UnboundedSender<VisibilityEvent>) -> VisibilityCallback {
    let events = events.clone();
    Arc::new(move |event| {
        // Closed only once the trigger task is gone
        let _ = events.send(event);
    })
}

async fn run<T>(
    controller: WeakController<T>,
    source: Arc<dyn VisibilitySource>,
    mut events: mpsc::UnboundedReceiver<VisibilityEvent>,
    mut snapshots: watch::Receiver<Snapshot<T>>,
) where
    T: Clone + Send + Sync + 'static,
{
    let mut visible = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { return };
                visible = event.is_intersecting;
                if !visible {
                    continue;
                }

                let ready = snapshots.borrow().can_request();
                if !ready {
                    debug!("Sentinel visible but controller busy or done");
                    continue;
                }
                match controller.upgrade() {
                    Some(controller) => {
                        if controller.request_next_page() {
                            debug!("Sentinel visible (ratio {:.2}), requested next page", event.intersection_ratio);
                        }
                    }
                    None => return,
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
                let ready = snapshots.borrow_and_update().can_request();

                // New items may have pushed the sentinel out of view; ask
                // the source instead of firing from the completion itself
                if ready && visible {
                    tokio::task::yield_now().await;
                    source.recheck();
                }
            }
        }
    }
}
