// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Infinite Scroll
//!
//! An incremental pagination controller for infinite scroll lists: it
//! fetches successive pages from an async loader, accumulates them in
//! order, and exposes a read-only snapshot to rendering code.
//!
//! ## Features
//!
//! - **Single Request In Flight**: Rapid or concurrent triggers never overlap fetches
//! - **Explicit Retry**: Failures keep items and cursor; retry repeats the exact request
//! - **Warm Start**: Seed the controller with items fetched ahead of time
//! - **Triggers**: Sentinel visibility, a manual "load more" control, or auto-advance
//! - **Unmount Safety**: Results settling after teardown or reset are discarded
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use infinite_scroll::{loader_fn, Controller, PageRequest, PageResult, PagerConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PagerConfig::builder().page_size(20).build()?;
//!     let controller = Controller::mount(config, loader_fn(|req: PageRequest| async move {
//!         let items = fetch_rows(req.offset, req.limit).await?;
//!         Ok(PageResult::new(items, 1302))
//!     }))?;
//!
//!     controller.request_next_page();
//!     let snapshot = controller.settled().await;
//!     println!("{} items, more: {}", snapshot.len(), snapshot.has_more);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────────────┐   ┌───────────────────┐
//!  │ Intersection Trigger │   │ Auto-Advance Loop │
//!  └──────────┬───────────┘   └─────────┬─────────┘
//!             │   request_next_page()   │
//!             ▼                         ▼
//!  ┌──────────────────────────────────────────────┐      ┌─────────────┐
//!  │  Controller ── Pagination State Machine      │ ───▶ │ Page Loader │
//!  └──────────────────────┬───────────────────────┘ ◀─── └─────────────┘
//!                         │ every transition
//!                         ▼
//!               ┌──────────────────┐
//!               │ State Projector  │ ──▶ Snapshot (watch channel)
//!               └──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the controller
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pager configuration and observer options
pub mod config;

/// Page loaders and loader decorators
pub mod fetcher;

/// Pagination state machine
pub mod pagination;

/// Snapshot projection
pub mod projector;

/// Controller owning the pagination state
pub mod controller;

/// Background auto-advance loop
pub mod auto_advance;

/// Visibility and manual triggers
pub mod trigger;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorInfo, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{ObserverOptions, PagerConfig, RootMargin, Threshold};
pub use controller::{Controller, ControllerBuilder, PublicState, RetryHandle};
pub use fetcher::{loader_fn, HttpPageLoader, PageLoader};
pub use pagination::Seed;
pub use projector::{DebugView, Snapshot};
pub use trigger::{IntersectionTrigger, LoadMoreTrigger, VisibilitySource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
