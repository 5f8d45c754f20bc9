//! Mock time provider with controllable time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::traits::TimeProvider;

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a clock starting at the given epoch-millis timestamp.
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    /// Set the current time.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl TimeProvider for MockClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
