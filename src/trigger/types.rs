//! Visibility capability types

use crate::config::ObserverOptions;
use crate::error::Result;
use std::sync::Arc;

/// One report from a visibility observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEvent {
    /// The sentinel intersects the (margin-extended) root
    pub is_intersecting: bool,
    /// Visible fraction of the sentinel, in `[0, 1]`
    pub intersection_ratio: f64,
}

impl VisibilityEvent {
    /// Event for a sentinel entering the root
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: true,
            intersection_ratio: ratio,
        }
    }

    /// Event for a sentinel outside the root
    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
        }
    }
}

/// Callback a visibility source reports through
pub type VisibilityCallback = Arc<dyn Fn(VisibilityEvent) + Send + Sync>;

/// A platform visibility observer watching a single sentinel
///
/// Implementations report the sentinel's current state once when observing
/// starts and then whenever it crosses a threshold.
pub trait VisibilitySource: Send + Sync {
    /// Start observing with `options`, replacing any previous observation
    fn observe(&self, options: &ObserverOptions, callback: VisibilityCallback) -> Result<()>;

    /// Stop observing; no further callbacks are made
    fn unobserve(&self);

    /// Report the current state again even if nothing crossed a threshold
    ///
    /// Called by the trigger once a page settles. The rows of that page
    /// must already be laid out by then, or the report reflects stale
    /// geometry and may fetch one page too many.
    fn recheck(&self);
}
