//! Manual "load more" control

use crate::controller::Controller;

/// Button-style trigger for callers that load on demand
#[derive(Debug, Clone)]
pub struct LoadMoreTrigger<T> {
    controller: Controller<T>,
}

impl<T> LoadMoreTrigger<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Bind a trigger to a controller
    pub fn new(controller: &Controller<T>) -> Self {
        Self {
            controller: controller.clone(),
        }
    }

    /// Nothing more to load, or the controller is gone
    pub fn is_disabled(&self) -> bool {
        !self.controller.is_mounted() || !self.controller.snapshot().has_more
    }

    /// A page is loading
    pub fn is_busy(&self) -> bool {
        self.controller.snapshot().loading
    }

    /// Request the next page, returning whether one was issued
    pub fn press(&self) -> bool {
        if self.is_disabled() {
            return false;
        }
        self.controller.request_next_page()
    }
}
