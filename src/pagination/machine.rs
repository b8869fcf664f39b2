//! State machine transitions
//!
//! ```text
//!            begin_next                 complete(Ok), more left
//!   Idle ───────────────▶ Loading ─────────────────────────────▶ Idle
//!    ▲                     │   │  complete(Ok), none left
//!    │ reset               │   └──────────────────────────────▶ Exhausted
//!    │                     │ complete(Err)
//!    │                     ▼
//!    └──────────────────  Error ──── begin_retry ──▶ Loading
//! ```
//!
//! Transitions never perform I/O. The controller hands the issued
//! [`InFlight`] request to the loader and feeds the outcome back through
//! [`PaginationState::complete`].

use super::types::{Completion, InFlight, PaginationState, Seed};
use crate::config::PagerConfig;
use crate::error::ErrorInfo;
use crate::types::{PageRequest, PageResult, RequestId, Status};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl<T: Clone> PaginationState<T> {
    /// Fresh state for a config, nothing fetched yet
    pub fn new(config: &PagerConfig) -> Self {
        Self {
            items: Arc::new(Vec::new()),
            cursor: config.initial_page,
            fetched_count: 0,
            total_count: None,
            total_inferred: false,
            status: Status::Idle,
            last_error: None,
            in_flight: None,
            failed_request: None,
            page_size: config.page_size,
            initial_page: config.initial_page,
            pages_loaded: 0,
            next_id: 0,
        }
    }

    /// State warm-started from pre-fetched items
    pub fn with_seed(config: &PagerConfig, seed: Seed<T>) -> Self {
        let mut state = Self::new(config);
        state.apply_seed(seed);
        state
    }

    /// The request `begin_next` would issue
    pub fn next_request(&self) -> PageRequest {
        PageRequest::new(self.fetched_count, self.page_size, self.cursor)
    }

    /// Issue the next page request
    ///
    /// Returns `None` (no-op) while loading or once exhausted. From `Error`
    /// the cursor is unchanged, so this re-issues the failed page.
    pub fn begin_next(&mut self) -> Option<InFlight> {
        match self.status {
            Status::Loading | Status::Exhausted => {
                debug!("Ignoring next-page request while {}", self.status);
                None
            }
            Status::Idle | Status::Error => {
                let request = self.next_request();
                Some(self.issue(request))
            }
        }
    }

    /// Re-issue the request that just failed
    ///
    /// Returns `None` (no-op) unless the state is `Error`.
    pub fn begin_retry(&mut self) -> Option<InFlight> {
        if self.status != Status::Error {
            debug!("Ignoring retry while {}", self.status);
            return None;
        }

        let request = self.failed_request.unwrap_or_else(|| self.next_request());
        Some(self.issue(request))
    }

    /// Apply the loader outcome for request `id`
    pub fn complete(
        &mut self,
        id: RequestId,
        outcome: Result<PageResult<T>, ErrorInfo>,
    ) -> Completion {
        let Some(in_flight) = self.in_flight.filter(|f| f.id == id) else {
            debug!("Discarding stale result for request {id}");
            return Completion::Stale;
        };
        self.in_flight = None;

        match outcome {
            Ok(page) => self.merge(in_flight.request, page),
            Err(error) => {
                warn!("{} failed: {error}", in_flight.request);
                self.status = Status::Error;
                self.last_error = Some(error);
                self.failed_request = Some(in_flight.request);
                Completion::Failed
            }
        }
    }

    /// Clear everything, optionally warm-starting from a seed
    ///
    /// A request in flight is abandoned: its completion will be `Stale`.
    pub fn reset(&mut self, seed: Option<Seed<T>>) {
        if let Some(abandoned) = self.in_flight.take() {
            info!("Reset abandons in-flight {}", abandoned.request);
        }

        self.items = Arc::new(Vec::new());
        self.cursor = self.initial_page;
        self.fetched_count = 0;
        self.total_count = None;
        self.total_inferred = false;
        self.status = Status::Idle;
        self.last_error = None;
        self.failed_request = None;
        self.pages_loaded = 0;

        if let Some(seed) = seed {
            self.apply_seed(seed);
        }
    }

    /// Drop the in-flight request without changing anything else visible
    pub(crate) fn abandon(&mut self) -> Option<InFlight> {
        let abandoned = self.in_flight.take();
        if abandoned.is_some() && self.status == Status::Loading {
            self.status = if self.has_more() {
                Status::Idle
            } else {
                Status::Exhausted
            };
        }
        abandoned
    }

    fn issue(&mut self, request: PageRequest) -> InFlight {
        self.next_id += 1;
        let in_flight = InFlight {
            id: RequestId(self.next_id),
            request,
        };

        self.status = Status::Loading;
        self.last_error = None;
        self.in_flight = Some(in_flight);
        debug!("Issued {request} as request {}", in_flight.id);
        in_flight
    }

    fn merge(&mut self, request: PageRequest, page: PageResult<T>) -> Completion {
        let received = page.items.len();
        let end = request.offset + received as u64;

        if received > 0 {
            Arc::make_mut(&mut self.items).extend(page.items);
        }
        self.fetched_count += received as u64;
        self.cursor = request.page + 1;
        self.pages_loaded += 1;
        self.failed_request = None;

        match page.total_count {
            Some(total) => {
                if total == 0 || total < end {
                    debug!("Total count {total} is below the {end} items received, exhausting");
                }
                self.total_count = Some(total);
                self.total_inferred = false;
            }
            None if received < request.limit as usize => {
                debug!(
                    "Short page ({received} < {}) without total count, inferring exhaustion",
                    request.limit
                );
                self.infer_total();
            }
            None => {}
        }

        // An empty page can never make progress, whatever the total claims
        if received == 0 && self.has_more() {
            self.infer_total();
        }

        self.status = if self.has_more() {
            Status::Idle
        } else {
            info!(
                "Exhausted after {} items in {} pages",
                self.fetched_count, self.pages_loaded
            );
            Status::Exhausted
        };

        Completion::Applied {
            status: self.status,
            received,
        }
    }

    fn infer_total(&mut self) {
        self.total_count = Some(self.fetched_count);
        self.total_inferred = true;
    }

    fn apply_seed(&mut self, seed: Seed<T>) {
        let fetched = seed.fetched_count.unwrap_or(seed.items.len() as u64);
        let pages_seeded = fetched.div_ceil(u64::from(self.page_size)) as u32;

        self.items = Arc::new(seed.items);
        self.fetched_count = fetched;
        self.total_count = seed.total_count;
        self.cursor = seed
            .cursor
            .unwrap_or(self.initial_page.saturating_add(pages_seeded));
        self.status = if self.has_more() {
            Status::Idle
        } else {
            Status::Exhausted
        };

        info!(
            "Warm start with {fetched} items, total {:?}, next page {}",
            self.total_count, self.cursor
        );
    }
}
