//! Auto-advance loop
//!
//! Background driver that keeps requesting pages while the controller is
//! idle with more to load. It only reads snapshots and calls
//! [`Controller::request_next_page`], so it is bound by the same
//! single-request rule as any other trigger.
//!
//! The loop stops for good once the list is exhausted and pauses while the
//! last request is in error; an explicit retry (or reset) resumes it.

use crate::controller::{Controller, WeakController};
use crate::projector::Snapshot;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What the loop does with a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Request,
    Wait,
    Stop,
}

impl Step {
    fn for_snapshot<T>(snapshot: &Snapshot<T>) -> Self {
        if snapshot.is_exhausted() {
            Self::Stop
        } else if snapshot.can_request() {
            Self::Request
        } else {
            Self::Wait
        }
    }
}

/// Spawn the loop for a controller on the given runtime
pub(crate) fn spawn_on<T>(runtime: &Handle, controller: &Controller<T>) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
{
    let snapshots = controller.subscribe();
    let weak = controller.downgrade();
    runtime.spawn(run(weak, snapshots))
}

async fn run<T>(controller: WeakController<T>, mut snapshots: watch::Receiver<Snapshot<T>>)
where
    T: Clone + Send + Sync + 'static,
{
    debug!("Auto-advance started");
    let mut requested = 0u32;

    loop {
        let step = Step::for_snapshot(&snapshots.borrow_and_update());

        match step {
            Step::Stop => {
                info!("Auto-advance finished after {requested} requests");
                return;
            }
            Step::Request => {
                let Some(controller) = controller.upgrade() else {
                    return;
                };
                if !controller.is_mounted() {
                    return;
                }
                if controller.request_next_page() {
                    requested += 1;
                }
            }
            Step::Wait => {}
        }

        if snapshots.changed().await.is_err() {
            debug!("Controller dropped, auto-advance stopping");
            return;
        }
    }
}
