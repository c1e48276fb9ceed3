//! Bounded, paced batch execution shared by validation and cleanup.

mod executor;
mod progress;
mod throttle;

pub use executor::{BatchPlan, BatchRun, run_batched};
pub use progress::ProgressTracker;
pub use throttle::{FixedDelayThrottle, NoDelay, Throttle};
