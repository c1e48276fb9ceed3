//! Violation-date containment check.
//!
//! Decides whether a violation falls inside a lease's active interval. All
//! instants are reduced to their UTC calendar date, an open lease ends
//! "today", and both ends are widened by [`DATE_TOLERANCE_DAYS`] to absorb
//! timezone skew at the boundaries. Auto-assignment and cleanup both use
//! this check, so they always agree.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days of slack applied before the lease start and after the lease end.
pub const DATE_TOLERANCE_DAYS: u64 = 1;

/// The outcome of a date check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCheck {
    /// True when the violation falls inside the widened interval.
    pub is_valid: bool,
    /// Why the check failed. `None` when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DateCheck {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    fn invalid(reason: String) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

/// Checks a violation date against a lease interval, treating an open lease
/// as ending now.
///
/// # Example
///
/// ```
/// use fine_reconciler::matching::validate_fine_date;
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap();
/// let end = Some(Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap());
///
/// // One day before the start is inside the tolerance buffer.
/// let violation = Utc.with_ymd_and_hms(2025, 3, 9, 23, 0, 0).unwrap();
/// assert!(validate_fine_date(violation, start, end).is_valid);
///
/// // Two days before is not.
/// let violation = Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap();
/// assert!(!validate_fine_date(violation, start, end).is_valid);
/// ```
pub fn validate_fine_date(
    violation_date: DateTime<Utc>,
    lease_start: DateTime<Utc>,
    lease_end: Option<DateTime<Utc>>,
) -> DateCheck {
    validate_fine_date_at(violation_date, lease_start, lease_end, Utc::now())
}

/// Same as [`validate_fine_date`], with an explicit "now" for open leases.
pub fn validate_fine_date_at(
    violation_date: DateTime<Utc>,
    lease_start: DateTime<Utc>,
    lease_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateCheck {
    let violation = violation_date.date_naive();
    let start = lease_start.date_naive();
    let end = lease_end.unwrap_or(now).date_naive();

    let earliest = widen_back(start);
    let latest = widen_forward(end);

    if violation < earliest {
        return DateCheck::invalid(format!(
            "violation date {} is before lease start {} (tolerance {} day)",
            violation, start, DATE_TOLERANCE_DAYS
        ));
    }
    if violation > latest {
        let end_label = if lease_end.is_some() {
            "lease end"
        } else {
            "today (lease still open)"
        };
        return DateCheck::invalid(format!(
            "violation date {} is after {} {} (tolerance {} day)",
            violation, end_label, end, DATE_TOLERANCE_DAYS
        ));
    }
    DateCheck::valid()
}

fn widen_back(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(DATE_TOLERANCE_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

fn widen_forward(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(DATE_TOLERANCE_DAYS))
        .unwrap_or(NaiveDate::MAX)
}
