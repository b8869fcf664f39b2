//! Pagination state types
//!
//! Defines the state owned by the state machine plus the warm-start seed and
//! the records describing in-flight requests and their completions.

use crate::error::ErrorInfo;
use crate::types::{PageRequest, RequestId, Status};
use std::sync::Arc;

/// Items fetched ahead of mounting, so the controller starts warm
#[derive(Debug, Clone, PartialEq)]
pub struct Seed<T> {
    /// Already fetched items, in order
    pub items: Vec<T>,
    /// Items counted as fetched (defaults to `items.len()`)
    pub fetched_count: Option<u64>,
    /// Total item count, if known
    pub total_count: Option<u64>,
    /// Next page to request (defaults to the page after the seeded items)
    pub cursor: Option<u32>,
}

impl<T> Seed<T> {
    /// Seed with pre-fetched items
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            fetched_count: None,
            total_count: None,
            cursor: None,
        }
    }

    /// Set the known total count
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Override the fetched count
    #[must_use]
    pub fn with_fetched(mut self, fetched: u64) -> Self {
        self.fetched_count = Some(fetched);
        self
    }

    /// Override the next page index
    #[must_use]
    pub fn with_cursor(mut self, cursor: u32) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

impl<T> Default for Seed<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A request the state machine has issued and not yet resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    /// Identity used to match the completion
    pub id: RequestId,
    /// The request handed to the loader
    pub request: PageRequest,
}

/// What applying a loader outcome did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Items were appended; `status` is the new status
    Applied {
        /// Status after the merge (`Idle` or `Exhausted`)
        status: Status,
        /// Items received in this page
        received: usize,
    },
    /// The request failed and the state moved to `Error`
    Failed,
    /// The request is no longer current (reset or unmounted); nothing changed
    Stale,
}

impl Completion {
    /// Check if the outcome changed state
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Stale)
    }
}

/// The single source of truth for one controller
///
/// Mutated only through the transitions in `machine.rs`.
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
    pub(super) items: Arc<Vec<T>>,
    pub(super) cursor: u32,
    pub(super) fetched_count: u64,
    pub(super) total_count: Option<u64>,
    pub(super) total_inferred: bool,
    pub(super) status: Status,
    pub(super) last_error: Option<ErrorInfo>,
    pub(super) in_flight: Option<InFlight>,
    pub(super) failed_request: Option<PageRequest>,
    pub(super) page_size: u32,
    pub(super) initial_page: u32,
    pub(super) pages_loaded: u32,
    pub(super) next_id: u64,
}

impl<T> PaginationState<T> {
    /// Accumulated items, in arrival order
    pub fn items(&self) -> &Arc<Vec<T>> {
        &self.items
    }

    /// Next page index to request
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Items successfully accumulated
    pub fn fetched_count(&self) -> u64 {
        self.fetched_count
    }

    /// Known (or inferred) total item count
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Whether the total was inferred from a short page
    pub fn is_total_inferred(&self) -> bool {
        self.total_inferred
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Last failure, if any
    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    /// The pending request, if any
    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    /// The request that failed last, kept for retry
    pub fn failed_request(&self) -> Option<&PageRequest> {
        self.failed_request.as_ref()
    }

    /// Items requested per page
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Pages merged since mount or last reset
    pub fn pages_loaded(&self) -> u32 {
        self.pages_loaded
    }

    /// More items may exist
    pub fn has_more(&self) -> bool {
        self.total_count.map_or(true, |total| self.fetched_count < total)
    }
}
