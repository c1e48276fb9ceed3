//! Pacing between concurrency windows and batches.
//!
//! The authority publishes no quota, so the engine limits itself with fixed
//! pauses. Pacing sits behind the [`Throttle`] trait so tests can run with
//! [`NoDelay`] and deployments can tune the delays from configuration.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ValidationConfig;

/// Pacing hooks called by the batch executor.
#[async_trait]
pub trait Throttle: Send + Sync {
    /// Called between two concurrency windows of the same batch.
    async fn between_windows(&self);

    /// Called between two batches.
    async fn between_batches(&self);
}

/// Sleeps for fixed durations at each boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelayThrottle {
    /// Pause between windows.
    pub window_delay: Duration,
    /// Pause between batches.
    pub batch_delay: Duration,
}

impl FixedDelayThrottle {
    /// Creates a throttle with explicit delays.
    pub fn new(window_delay: Duration, batch_delay: Duration) -> Self {
        Self {
            window_delay,
            batch_delay,
        }
    }

    /// Builds the throttle from validation settings.
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.window_delay_ms),
            Duration::from_millis(config.batch_delay_ms),
        )
    }
}

impl Default for FixedDelayThrottle {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

#[async_trait]
impl Throttle for FixedDelayThrottle {
    async fn between_windows(&self) {
        if !self.window_delay.is_zero() {
            tokio::time::sleep(self.window_delay).await;
        }
    }

    async fn between_batches(&self) {
        if !self.batch_delay.is_zero() {
            tokio::time::sleep(self.batch_delay).await;
        }
    }
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoDelay;

#[async_trait]
impl Throttle for NoDelay {
    async fn between_windows(&self) {}

    async fn between_batches(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_default_delays() {
        let throttle = FixedDelayThrottle::default();
        assert_eq!(throttle.window_delay, Duration::from_millis(300));
        assert_eq!(throttle.batch_delay, Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_fixed_delay_sleeps() {
        let throttle =
            FixedDelayThrottle::new(Duration::from_millis(15), Duration::from_millis(30));
        let started = Instant::now();
        throttle.between_windows().await;
        throttle.between_batches().await;
        assert!(started.elapsed() >= Duration::from_millis(45));
    }
}
