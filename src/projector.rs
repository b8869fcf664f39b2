//! Public state projection
//!
//! Derives the read-only snapshot consumed by rendering code from the
//! pagination state. Projection is a pure function, re-run after every
//! transition.

use crate::error::ErrorInfo;
use crate::pagination::PaginationState;
use crate::types::{PageRequest, Status};
use serde::Serialize;
use std::sync::Arc;

/// What rendering code sees
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Accumulated items, in arrival order
    pub visible_items: Arc<Vec<T>>,
    /// More items may exist
    pub has_more: bool,
    /// A page request is in flight
    pub loading: bool,
    /// Failure of the last request, only while in the error state
    pub error: Option<ErrorInfo>,
    /// Introspection view, present when debug is enabled
    pub debug: Option<DebugView>,
}

impl<T> Snapshot<T> {
    /// Number of visible items
    pub fn len(&self) -> usize {
        self.visible_items.len()
    }

    /// Check if no items are visible
    pub fn is_empty(&self) -> bool {
        self.visible_items.is_empty()
    }

    /// Nothing loaded, nothing loading, nothing failed
    pub fn is_blank(&self) -> bool {
        self.is_empty() && !self.loading && self.error.is_none()
    }

    /// A next-page request would be issued right now
    pub fn can_request(&self) -> bool {
        self.has_more && !self.loading && self.error.is_none()
    }

    /// Nothing more will ever load (until a reset)
    pub fn is_exhausted(&self) -> bool {
        !self.has_more && !self.loading
    }
}

/// Internal counters exposed for introspection and testing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugView {
    /// State machine status
    pub status: Status,
    /// Page index of the next request
    pub cursor: u32,
    /// Items accumulated so far
    pub fetched_count: u64,
    /// Known or inferred total
    pub total_count: Option<u64>,
    /// Total was inferred from a short or empty page
    pub total_inferred: bool,
    /// Successful page loads since mount or reset
    pub pages_loaded: u32,
    /// Request currently awaiting its result
    pub in_flight: Option<PageRequest>,
}

impl std::fmt::Display for DebugView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let total = match (self.total_count, self.total_inferred) {
            (Some(t), false) => t.to_string(),
            (Some(t), true) => format!("{t} (inferred)"),
            (None, _) => "?".to_string(),
        };
        write!(
            f,
            "status={} cursor={} fetched={}/{} pages={}",
            self.status, self.cursor, self.fetched_count, total, self.pages_loaded
        )?;
        if let Some(req) = &self.in_flight {
            write!(f, " in_flight=[{req}]")?;
        }
        Ok(())
    }
}

/// Project pagination state into a snapshot
pub fn project<T>(state: &PaginationState<T>, debug: bool) -> Snapshot<T> {
    let status = state.status();
    Snapshot {
        visible_items: Arc::clone(state.items()),
        has_more: state.has_more(),
        loading: status == Status::Loading,
        error: if status == Status::Error {
            state.last_error().cloned()
        } else {
            None
        },
        debug: debug.then(|| debug_view(state)),
    }
}

/// Introspection view of pagination state
pub fn debug_view<T>(state: &PaginationState<T>) -> DebugView {
    DebugView {
        status: state.status(),
        cursor: state.cursor(),
        fetched_count: state.fetched_count(),
        total_count: state.total_count(),
        total_inferred: state.is_total_inferred(),
        pages_loaded: state.pages_loaded(),
        in_flight: state.in_flight().map(|f| f.request),
    }
}
