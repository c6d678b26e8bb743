//! Page boundary: catches panics raised while rendering a page.
//!
//! After a failure the page is not rendered again until the user retries.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct PageBoundary {
    page: &'static str,
    failure: Option<PageFailure>,
}

impl PageBoundary {
    pub fn new(page: &'static str) -> Self {
        Self {
            page,
            failure: None,
        }
    }

    /// Render through the boundary. Returns `None` if the page panicked now
    /// or is still showing an earlier failure.
    pub fn render<R>(&mut self, render: impl FnOnce() -> R) -> Option<R> {
        if self.failure.is_some() {
            return None;
        }
        match catch_unwind(AssertUnwindSafe(render)) {
            Ok(value) => Some(value),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(page = self.page, %message, "Page render panicked");
                self.failure = Some(PageFailure {
                    page: self.page,
                    message,
                });
                None
            }
        }
    }

    pub fn failure(&self) -> Option<&PageFailure> {
        self.failure.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Clear the failure so the next render tries again.
    pub fn retry(&mut self) {
        self.failure = None;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_passes_value_through() {
        let mut boundary = PageBoundary::new("editor");
        assert_eq!(boundary.render(|| 42), Some(42));
        assert!(!boundary.has_failed());
    }

    #[test]
    fn test_panic_is_caught_until_retry() {
        let mut boundary = PageBoundary::new("editor");
        let out: Option<()> = boundary.render(|| panic!("layout exploded"));
        assert!(out.is_none());
        assert_eq!(boundary.failure().unwrap().message, "layout exploded");

        let mut called = false;
        boundary.render(|| called = true);
        assert!(!called);

        boundary.retry();
        assert_eq!(boundary.render(|| 1), Some(1));
    }
}
