//! Trigger module
//!
//! Callers of the controller's next-page entry point other than the
//! auto-advance loop.
//!
//! # Overview
//!
//! The trigger module provides:
//! - `VisibilitySource` - Capability for a platform visibility observer
//! - `IntersectionTrigger` - Requests pages when a sentinel becomes visible
//! - `ViewportSource` - Geometry-driven source for headless use
//! - `LoadMoreTrigger` - The manual "load more" control
//!
//! # Example
//!
//! ```rust,ignore
//! use infinite_scroll::trigger::{IntersectionTrigger, Layout, ViewportSource};
//!
//! let viewport = Arc::new(ViewportSource::new(Layout::list(600.0, 0, 40.0)));
//! let trigger = IntersectionTrigger::attach(&controller, viewport.clone())?;
//!
//! viewport.scroll_to_end();
//! ```

mod intersection;
mod manual;
mod types;
mod viewport;

pub use intersection::IntersectionTrigger;
pub use manual::LoadMoreTrigger;
pub use types::{VisibilityCallback, VisibilityEvent, VisibilitySource};
pub use viewport::{Layout, ViewportSource};

#[cfg(test)]
mod tests;
