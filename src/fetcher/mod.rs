//! Page fetcher module
//!
//! The page loader is the controller's only suspension point: an opaque,
//! possibly slow, possibly failing call mapping a [`PageRequest`] to a
//! [`PageResult`].
//!
//! # Overview
//!
//! The fetcher module provides:
//! - `PageLoader` - The async loader trait
//! - `FnLoader` - Adapts any async closure
//! - `TimeoutLoader` / `RateLimitedLoader` - Decorators for deadlines and throttling
//! - `HttpPageLoader` - Offset/limit pagination over a JSON REST endpoint
//!
//! [`PageRequest`]: crate::types::PageRequest
//! [`PageResult`]: crate::types::PageResult

mod decorators;
mod http;
mod rate_limit;
mod types;

pub use decorators::{RateLimitedLoader, TimeoutLoader};
pub use http::{extract_path, HttpPageLoader};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use types::{loader_fn, FnLoader, PageLoader};
