//! Common types used throughout the crate
//!
//! Page requests and results exchanged with the page loader, plus the
//! controller status enum shared by the state machine and the snapshot.

use serde::{Deserialize, Serialize};

// ============================================================================
// Page Request
// ============================================================================

/// One bounded fetch: `offset` items skipped, `limit` items wanted, 1-based `page`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items already accumulated before this page
    pub offset: u64,
    /// Number of items requested
    pub limit: u32,
    /// Page index (starts at the configured initial page)
    pub page: u32,
}

impl PageRequest {
    /// Create a page request
    pub fn new(offset: u64, limit: u32, page: u32) -> Self {
        Self {
            offset,
            limit,
            page,
        }
    }
}

impl std::fmt::Display for PageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "page {} (offset={}, limit={})",
            self.page, self.offset, self.limit
        )
    }
}

// ============================================================================
// Page Result
// ============================================================================

/// Items returned for one page, with the total item count when known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// Items of this page, in order
    pub items: Vec<T>,
    /// Total number of items available, if the source reports it
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl<T> PageResult<T> {
    /// Create a page result with a known total
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self {
            items,
            total_count: Some(total_count),
        }
    }

    /// Create a page result without total count information
    pub fn without_total(items: Vec<T>) -> Self {
        Self {
            items,
            total_count: None,
        }
    }

    /// Number of items in this page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if this page carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Status
// ============================================================================

/// Fetch status of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No request in flight, more pages may exist
    #[default]
    Idle,
    /// A page request is in flight
    Loading,
    /// The last request failed; waiting for an explicit retry
    Error,
    /// No more pages exist
    Exhausted,
}

impl Status {
    /// Check if a request is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Check if the controller is exhausted
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Check if the last request failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Request Identity
// ============================================================================

/// Identity of an issued page request, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
