//! Pagination module
//!
//! The incremental pagination state machine: cumulative items, fetch status,
//! cursor and total-count knowledge.
//!
//! # Overview
//!
//! State moves `idle → loading → idle | error | exhausted`. At most one
//! request is in flight; a failed request leaves the cursor where it was so
//! that retry repeats the identical request. Completions are matched by
//! request identity, so results arriving after a reset are discarded.

mod machine;
mod types;

pub use types::{Completion, InFlight, PaginationState, Seed};
