//! A violation authority with pre-programmed answers.
//!
//! Stands in for the real authority in tests, benches and local runs. It
//! counts calls and records the highest number of concurrent calls seen.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::client::{AuthorityError, AuthorityResponse, ViolationAuthority};

/// Source identifier recorded on results from this authority.
pub const SCRIPTED_AUTHORITY_SOURCE: &str = "scripted";

/// Answers from a fixed table; unknown plates report no fine.
///
/// # Example
///
/// ```
/// use fine_reconciler::authority::{AuthorityError, ScriptedAuthority};
///
/// let authority = ScriptedAuthority::new()
///     .with_fine("ABC123")
///     .failing("BAD001", AuthorityError::RateLimited);
/// assert_eq!(authority.calls(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedAuthority {
    outcomes: HashMap<String, Result<bool, AuthorityError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAuthority {
    /// Creates an authority that reports no fine for every plate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports an outstanding fine for `plate`.
    pub fn with_fine(mut self, plate: impl Into<String>) -> Self {
        self.outcomes.insert(plate.into(), Ok(true));
        self
    }

    /// Fails every call for `plate` with `error`.
    pub fn failing(mut self, plate: impl Into<String>, error: AuthorityError) -> Self {
        self.outcomes.insert(plate.into(), Err(error));
        self
    }

    /// Sleeps for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ViolationAuthority for ScriptedAuthority {
    fn source_id(&self) -> &str {
        SCRIPTED_AUTHORITY_SOURCE
    }

    async fn validate(&self, license_plate: &str) -> Result<AuthorityResponse, AuthorityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            // Yield so that calls in the same window overlap.
            None => tokio::task::yield_now().await,
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let has_fine = match self.outcomes.get(license_plate) {
            Some(Ok(has_fine)) => *has_fine,
            Some(Err(error)) => return Err(error.clone()),
            None => false,
        };

        Ok(AuthorityResponse {
            license_plate: license_plate.to_string(),
            has_fine,
            validation_source: SCRIPTED_AUTHORITY_SOURCE.to_string(),
            details: if has_fine {
                "outstanding violation listed".to_string()
            } else {
                "no outstanding violations".to_string()
            },
        })
    }
}
