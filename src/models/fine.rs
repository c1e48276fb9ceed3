//! Traffic fine model and related types.
//!
//! This module defines the [`TrafficFine`] record along with its payment and
//! assignment status enums, and the [`AssignedFine`] view used by the
//! cleanup job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment state of a traffic fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// The fine has not been settled.
    Pending,
    /// The fine has been paid.
    Paid,
    /// The fine is under dispute.
    Disputed,
}

/// Whether a fine has been associated with a lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// No lease is associated.
    Pending,
    /// A lease is associated through `lease_id`.
    Assigned,
}

/// A traffic-violation record.
///
/// `assignment_status` is [`AssignmentStatus::Assigned`] exactly when
/// `lease_id` is set. Writers go through [`crate::store::FinePatch`], which
/// changes both fields together.
///
/// # Example
///
/// ```
/// use fine_reconciler::models::{AssignmentStatus, PaymentStatus, TrafficFine};
/// use chrono::{TimeZone, Utc};
/// use rust_decimal::Decimal;
///
/// let fine = TrafficFine {
///     id: "fine_001".to_string(),
///     violation_number: "V-2025-0001".to_string(),
///     license_plate: "ABC123".to_string(),
///     violation_date: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
///     fine_amount: Decimal::new(50000, 2),
///     violation_charge: "Speeding".to_string(),
///     payment_status: PaymentStatus::Pending,
///     assignment_status: AssignmentStatus::Pending,
///     lease_id: None,
///     location: None,
///     payment_date: None,
/// };
/// assert!(!fine.is_assigned());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficFine {
    /// Unique identifier for the fine.
    pub id: String,
    /// The authority's violation number.
    pub violation_number: String,
    /// License plate of the violating vehicle.
    pub license_plate: String,
    /// When the violation happened. Only the calendar date is significant.
    pub violation_date: DateTime<Utc>,
    /// The fine amount.
    pub fine_amount: Decimal,
    /// The charge description.
    pub violation_charge: String,
    /// Payment state.
    pub payment_status: PaymentStatus,
    /// Assignment state.
    pub assignment_status: AssignmentStatus,
    /// The lease the fine is attributed to.
    #[serde(default)]
    pub lease_id: Option<String>,
    /// Where the violation happened.
    #[serde(default)]
    pub location: Option<String>,
    /// When the fine was paid.
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
}

impl TrafficFine {
    /// Returns true if the fine is attributed to a lease.
    pub fn is_assigned(&self) -> bool {
        self.assignment_status == AssignmentStatus::Assigned && self.lease_id.is_some()
    }

    /// Returns true if the assignment fields agree with each other.
    pub fn assignment_consistent(&self) -> bool {
        match self.assignment_status {
            AssignmentStatus::Assigned => self.lease_id.is_some(),
            AssignmentStatus::Pending => self.lease_id.is_none(),
        }
    }
}

/// An assigned fine joined with the dates of its lease.
///
/// The lease dates are denormalized so the cleanup job can re-check every
/// assignment without another round trip per fine. `lease_start` is `None`
/// when the referenced lease no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedFine {
    /// The fine identifier.
    pub fine_id: String,
    /// The lease the fine is attributed to.
    pub lease_id: String,
    /// License plate on the fine.
    pub license_plate: String,
    /// When the violation happened.
    pub violation_date: DateTime<Utc>,
    /// Start of the lease.
    pub lease_start: Option<DateTime<Utc>>,
    /// End of the lease, `None` while the lease is open.
    pub lease_end: Option<DateTime<Utc>>,
}
