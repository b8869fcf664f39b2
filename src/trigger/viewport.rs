//! Headless visibility source
//!
//! Computes sentinel visibility from plain geometry: a vertical scroll
//! viewport, the root margin and the thresholds. Used where no platform
//! observer exists (the CLI simulator and tests).

use super::types::{VisibilityCallback, VisibilityEvent, VisibilitySource};
use crate::config::ObserverOptions;
use crate::error::{Error, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Geometry of the scroll container and the sentinel, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Visible height of the scroll container
    pub viewport_height: f64,
    /// Distance from the top of the content to the sentinel
    pub sentinel_top: f64,
    /// Height of the sentinel element
    pub sentinel_height: f64,
}

impl Layout {
    /// Layout for a list of `rows` rows followed by a sentinel
    pub fn list(viewport_height: f64, rows: usize, row_height: f64) -> Self {
        Self {
            viewport_height,
            sentinel_top: rows as f64 * row_height,
            sentinel_height: 1.0,
        }
    }

    /// Scroll offset at which the sentinel's bottom meets the viewport's
    pub fn max_scroll(&self) -> f64 {
        (self.sentinel_top + self.sentinel_height - self.viewport_height).max(0.0)
    }
}

struct Observation {
    options: ObserverOptions,
    callback: VisibilityCallback,
    /// Thresholds crossed at the last report, None before the first one
    crossed: Option<usize>,
}

struct ViewportState {
    name: Option<String>,
    layout: Layout,
    scroll_top: f64,
    observation: Option<Observation>,
}

/// Visibility source over a simulated scroll viewport
pub struct ViewportSource {
    state: Mutex<ViewportState>,
}

impl ViewportSource {
    /// Source for the top-level viewport (matches `root: None`)
    pub fn new(layout: Layout) -> Self {
        Self {
            state: Mutex::new(ViewportState {
                name: None,
                layout,
                scroll_top: 0.0,
                observation: None,
            }),
        }
    }

    /// Source for a named scroll container
    pub fn named(name: impl Into<String>, layout: Layout) -> Self {
        let source = Self::new(layout);
        source.lock().name = Some(name.into());
        source
    }

    /// Scroll to an absolute offset, clamped to the content
    pub fn scroll_to(&self, top: f64) {
        let mut state = self.lock();
        state.scroll_top = top.clamp(0.0, state.layout.max_scroll());
        self.report(state, false);
    }

    /// Scroll by a relative amount
    pub fn scroll_by(&self, delta: f64) {
        let top = self.scroll_top() + delta;
        self.scroll_to(top);
    }

    /// Scroll until the sentinel's bottom edge is in view
    pub fn scroll_to_end(&self) {
        let mut state = self.lock();
        state.scroll_top = state.layout.max_scroll();
        self.report(state, false);
    }

    /// Replace the layout, e.g. after new rows rendered
    pub fn set_layout(&self, layout: Layout) {
        let mut state = self.lock();
        state.layout = layout;
        state.scroll_top = state.scroll_top.min(layout.max_scroll());
        self.report(state, false);
    }

    /// Current layout
    pub fn layout(&self) -> Layout {
        self.lock().layout
    }

    /// Current scroll offset
    pub fn scroll_top(&self) -> f64 {
        self.lock().scroll_top
    }

    /// Check if an observation is active
    pub fn is_observing(&self) -> bool {
        self.lock().observation.is_some()
    }

    /// Visibility under the active observation, if any
    pub fn current(&self) -> Option<VisibilityEvent> {
        let state = self.lock();
        state
            .observation
            .as_ref()
            .map(|obs| measure(&state.layout, state.scroll_top, &obs.options).0)
    }

    fn lock(&self) -> MutexGuard<'_, ViewportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report through the callback if a threshold was crossed (or `force`)
    ///
    /// The callback runs after the lock is released.
    fn report(&self, mut state: MutexGuard<'_, ViewportState>, force: bool) {
        let layout = state.layout;
        let scroll_top = state.scroll_top;
        let Some(observation) = state.observation.as_mut() else {
            return;
        };

        let (event, crossed) = measure(&layout, scroll_top, &observation.options);
        if !force && observation.crossed == Some(crossed) {
            return;
        }
        observation.crossed = Some(crossed);
        let callback = observation.callback.clone();
        drop(state);

        debug!(
            "Sentinel {} at scroll {scroll_top:.0} (ratio {:.2})",
            if event.is_intersecting { "visible" } else { "hidden" },
            event.intersection_ratio
        );
        callback(event);
    }
}

impl VisibilitySource for ViewportSource {
    fn observe(&self, options: &ObserverOptions, callback: VisibilityCallback) -> Result<()> {
        let mut state = self.lock();
        if let Some(root) = &options.root {
            if state.name.as_deref() != Some(root.as_str()) {
                return Err(Error::observer(format!("unknown scroll root '{root}'")));
            }
        }

        state.observation = Some(Observation {
            options: options.clone(),
            callback,
            crossed: None,
        });
        self.report(state, true);
        Ok(())
    }

    fn unobserve(&self) {
        self.lock().observation = None;
    }

    fn recheck(&self) {
        self.report(self.lock(), true);
    }
}

impl std::fmt::Debug for ViewportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ViewportSource")
            .field("name", &state.name)
            .field("layout", &state.layout)
            .field("scroll_top", &state.scroll_top)
            .finish_non_exhaustive()
    }
}

/// Intersect the sentinel with the margin-extended viewport
///
/// Returns the event and how many thresholds the sentinel has reached.
fn measure(layout: &Layout, scroll_top: f64, options: &ObserverOptions) -> (VisibilityEvent, usize) {
    let height = layout.viewport_height;
    let margin = &options.root_margin;
    let root_top = scroll_top - margin.top.resolve(height);
    let root_bottom = scroll_top + height + margin.bottom.resolve(height);

    let top = layout.sentinel_top;
    let bottom = top + layout.sentinel_height;
    let touching = top <= root_bottom && bottom >= root_top;

    let ratio = if !touching {
        0.0
    } else if layout.sentinel_height > 0.0 {
        ((bottom.min(root_bottom) - top.max(root_top)) / layout.sentinel_height).clamp(0.0, 1.0)
    } else {
        1.0
    };

    let thresholds = options.threshold.ratios();
    let crossed = if touching {
        thresholds.iter().filter(|t| ratio >= **t).count()
    } else {
        0
    };

    let event = if touching && ratio >= options.threshold.min_ratio() {
        VisibilityEvent::visible(ratio)
    } else {
        VisibilityEvent::hidden()
    };
    (event, crossed)
}
