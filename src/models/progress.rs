//! Batch progress snapshot.

use serde::{Deserialize, Serialize};

/// Counters for a running or finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Number of items in the batch.
    pub total: usize,
    /// Items finished, successfully or not.
    pub processed: usize,
    /// Items that succeeded.
    pub successful: usize,
    /// Items that failed.
    pub failed: usize,
    /// Rounded completion percentage. An empty batch is 100 percent complete.
    pub percent_complete: u32,
}

impl BatchProgress {
    /// Builds a snapshot and derives the completion percentage.
    ///
    /// # Example
    ///
    /// ```
    /// use fine_reconciler::models::BatchProgress;
    ///
    /// let progress = BatchProgress::new(3, 1, 1, 0);
    /// assert_eq!(progress.percent_complete, 33);
    /// ```
    pub fn new(total: usize, processed: usize, successful: usize, failed: usize) -> Self {
        let percent_complete = if total == 0 {
            100
        } else {
            let processed = processed.min(total);
            ((processed * 100 + total / 2) / total) as u32
        };
        Self {
            total,
            processed,
            successful,
            failed,
            percent_complete,
        }
    }

    /// Returns true once every item has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds_to_nearest() {
        assert_eq!(BatchProgress::new(3, 2, 2, 0).percent_complete, 67);
        assert_eq!(BatchProgress::new(8, 1, 0, 1).percent_complete, 13);
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let progress = BatchProgress::new(0, 0, 0, 0);
        assert_eq!(progress.percent_complete, 100);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_full_batch_is_one_hundred_percent() {
        let progress = BatchProgress::new(5, 5, 4, 1);
        assert_eq!(progress.percent_complete, 100);
        assert!(progress.is_complete());
    }
}
