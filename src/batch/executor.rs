//! Bounded batch execution.
//!
//! Items are split into sequential batches of `batch_size`. Each batch is
//! split again into windows of `concurrency` items. A window runs as one task
//! group and finishes before the next window starts, so no more than
//! `concurrency` operations are ever in flight.

use std::future::Future;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::progress::ProgressTracker;
use super::throttle::Throttle;

/// Shape of a bounded batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Items per sequential batch. Zero is treated as one.
    pub batch_size: usize,
    /// Items per concurrency window. Zero is treated as one.
    pub concurrency: usize,
    /// Stop after the window that produced the first failure.
    pub stop_on_error: bool,
}

impl BatchPlan {
    /// Creates a plan that continues past failures.
    pub fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size,
            concurrency,
            stop_on_error: false,
        }
    }

    /// Sets whether the run stops at the first failing window.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}

/// The outcome of a bounded batch run.
#[derive(Debug)]
pub struct BatchRun<T, R, E> {
    /// Every processed item with its result, in completion-window order.
    pub outcomes: Vec<(T, Result<R, E>)>,
    /// True when the run stopped early because of `stop_on_error`.
    pub aborted: bool,
}

impl<T, R, E> BatchRun<T, R, E> {
    /// Number of successful items.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    /// Number of failed items.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_err()).count()
    }
}

/// Runs `op` over `items` in bounded batches.
///
/// `progress` is reset to the item count and updated as each item finishes.
/// `throttle` is consulted between windows and between batches.
///
/// # Example
///
/// ```
/// use fine_reconciler::batch::{BatchPlan, NoDelay, ProgressTracker, run_batched};
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let progress = ProgressTracker::new();
/// let run = rt.block_on(run_batched(
///     vec![1, 2, 3, 4, 5],
///     BatchPlan::new(2, 2),
///     &NoDelay,
///     &progress,
///     |n| async move { if n == 3 { Err("three") } else { Ok(n * 10) } },
/// ));
/// assert_eq!(run.succeeded(), 4);
/// assert_eq!(run.failed(), 1);
/// assert_eq!(progress.snapshot().percent_complete, 100);
/// ```
pub async fn run_batched<T, R, E, F, Fut>(
    items: Vec<T>,
    plan: BatchPlan,
    throttle: &dyn Throttle,
    progress: &ProgressTracker,
    op: F,
) -> BatchRun<T, R, E>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    progress.reset(items.len());

    let batch_size = plan.batch_size.max(1);
    let concurrency = plan.concurrency.max(1);
    let total_batches = items.len().div_ceil(batch_size);
    let mut outcomes = Vec::with_capacity(items.len());

    for (batch_index, batch) in items.chunks(batch_size).enumerate() {
        if batch_index > 0 {
            throttle.between_batches().await;
        }
        debug!(
            batch = batch_index + 1,
            total_batches,
            items = batch.len(),
            "starting batch"
        );

        for (window_index, window) in batch.chunks(concurrency).enumerate() {
            if window_index > 0 {
                throttle.between_windows().await;
            }

            let tracked = window.iter().cloned().map(|item| {
                let pending = op(item.clone());
                async move {
                    let result = pending.await;
                    match &result {
                        Ok(_) => progress.record_success(),
                        Err(_) => progress.record_failure(),
                    }
                    (item, result)
                }
            });
            let results = join_all(tracked).await;

            let window_failed = results.iter().any(|(_, r)| r.is_err());
            outcomes.extend(results);

            if window_failed && plan.stop_on_error {
                warn!(
                    batch = batch_index + 1,
                    processed = outcomes.len(),
                    "stopping batch run at first failure"
                );
                return BatchRun {
                    outcomes,
                    aborted: true,
                };
            }
        }

        let snapshot = progress.snapshot();
        info!(
            batch = batch_index + 1,
            total_batches,
            processed = snapshot.processed,
            successful = snapshot.successful,
            failed = snapshot.failed,
            percent_complete = snapshot.percent_complete,
            "batch complete"
        );
    }

    BatchRun {
        outcomes,
        aborted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::throttle::NoDelay;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingThrottle {
        windows: AtomicUsize,
        batches: AtomicUsize,
    }

    #[async_trait]
    impl Throttle for CountingThrottle {
        async fn between_windows(&self) {
            self.windows.fetch_add(1, Ordering::SeqCst);
        }

        async fn between_batches(&self) {
            self.batches.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let progress = ProgressTracker::new();
        let calls = AtomicUsize::new(0);
        let plan = BatchPlan::new(5, 2);
        let run: BatchRun<u32, (), ()> = run_batched(vec![], plan, &NoDelay, &progress, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert!(run.outcomes.is_empty());
        assert!(!run.aborted);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(progress.snapshot().percent_complete, 100);
    }

    #[tokio::test]
    async fn test_throttle_called_at_boundaries() {
        // 7 items, batches of 3, windows of 2: [[a,b],[c]] [[d,e],[f]] [[g]]
        let throttle = CountingThrottle::default();
        let progress = ProgressTracker::new();
        let run: BatchRun<u32, u32, ()> = run_batched(
            (0..7).collect(),
            BatchPlan::new(3, 2),
            &throttle,
            &progress,
            |n| async move { Ok(n) },
        )
        .await;

        assert_eq!(run.succeeded(), 7);
        assert_eq!(throttle.batches.load(Ordering::SeqCst), 2);
        assert_eq!(throttle.windows.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_concurrency() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let progress = ProgressTracker::new();

        let run: BatchRun<u32, (), ()> = run_batched(
            (0..10).collect(),
            BatchPlan::new(10, 3),
            &NoDelay,
            &progress,
            |_| {
                let in_flight = &in_flight;
                let peak = &peak;
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert_eq!(run.succeeded(), 10);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stop_on_error_finishes_window_then_stops() {
        let seen = Mutex::new(Vec::new());
        let progress = ProgressTracker::new();

        let run = run_batched(
            (1..=6).collect::<Vec<u32>>(),
            BatchPlan::new(6, 2).stop_on_error(true),
            &NoDelay,
            &progress,
            |n| {
                seen.lock().unwrap().push(n);
                async move { if n == 3 { Err(n) } else { Ok(n) } }
            },
        )
        .await;

        assert!(run.aborted);
        assert_eq!(run.outcomes.len(), 4);
        assert_eq!(run.failed(), 1);
        assert_eq!(seen.lock().unwrap().len(), 4);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.total, 6);
        assert_eq!(snapshot.processed, 4);
        assert_eq!(snapshot.failed, 1);
    }

    #[tokio::test]
    async fn test_zero_sizes_are_clamped() {
        let progress = ProgressTracker::new();
        let run: BatchRun<u32, u32, ()> = run_batched(
            vec![1, 2, 3],
            BatchPlan::new(0, 0),
            &NoDelay,
            &progress,
            |n| async move { Ok(n) },
        )
        .await;
        assert_eq!(run.succeeded(), 3);
    }
}
