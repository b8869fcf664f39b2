//! Controller module
//!
//! Wires the page loader, the pagination state machine and the snapshot
//! projection together behind a cloneable handle.
//!
//! # Overview
//!
//! The controller module provides:
//! - `Controller` - Owns the state and runs page loads on the Tokio runtime
//! - `ControllerBuilder` - Config and warm-start seed before mounting
//! - `PublicState` / `RetryHandle` - What rendering code receives
//! - `WeakController` - Non-owning handle for background tasks
//!
//! # Example
//!
//! ```rust,ignore
//! use infinite_scroll::{loader_fn, Controller, PageResult, PagerConfig};
//!
//! let controller = Controller::builder(loader_fn(|req| async move {
//!     Ok(PageResult::new(fetch(req.offset, req.limit).await?, 1302))
//! }))
//! .config(PagerConfig::default())
//! .mount()?;
//!
//! controller.request_next_page();
//! let snapshot = controller.settled().await;
//! ```

mod core;
mod handle;

pub use self::core::{Controller, ControllerBuilder};
pub use handle::{PublicState, RetryHandle, WeakController};

#[cfg(test)]
mod tests;
