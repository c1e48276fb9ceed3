//! Live progress counters shared between a running batch and its observers.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::BatchProgress;

/// Atomic batch counters.
///
/// The executor records each outcome as it is collected. Any task holding a
/// reference can take a [`BatchProgress`] snapshot at the same time.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    processed: AtomicUsize,
    successful: AtomicUsize,
    failed: AtomicUsize,
}

impl ProgressTracker {
    /// Creates a tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run of `total` items.
    pub fn reset(&self, total: usize) {
        self.processed.store(0, Ordering::SeqCst);
        self.successful.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Records one successful item.
    pub fn record_success(&self) {
        self.successful.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Records one failed item.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the current counters.
    pub fn snapshot(&self) -> BatchProgress {
        BatchProgress::new(
            self.total.load(Ordering::SeqCst),
            self.processed.load(Ordering::SeqCst),
            self.successful.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
        )
    }
}
