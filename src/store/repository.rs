//! The repository boundary between the engine and the persistent store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AssignedFine, AssignmentStatus, Lease, PaymentStatus, TrafficFine, ValidationLogEntry,
    ValidationResult, Vehicle,
};

use super::error::StoreResult;

/// A change to a fine's lease association.
///
/// The two variants are the only ways to touch `lease_id`, so the assignment
/// status can never disagree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AssignmentChange {
    /// Attribute the fine to a lease.
    Assign {
        /// The lease to attribute the fine to.
        lease_id: String,
    },
    /// Remove any attribution.
    Clear,
}

/// A change to a fine's payment fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentChange {
    /// New payment status.
    pub status: PaymentStatus,
    /// New payment date.
    pub payment_date: Option<DateTime<Utc>>,
}

/// A partial update to a [`TrafficFine`].
///
/// # Example
///
/// ```
/// use fine_reconciler::store::FinePatch;
///
/// let patch = FinePatch::clear_assignment();
/// assert!(patch.payment.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinePatch {
    /// Assignment change, if any.
    pub assignment: Option<AssignmentChange>,
    /// Payment change, if any.
    pub payment: Option<PaymentChange>,
}

impl FinePatch {
    /// Attributes the fine to `lease_id`.
    pub fn assign(lease_id: impl Into<String>) -> Self {
        Self {
            assignment: Some(AssignmentChange::Assign {
                lease_id: lease_id.into(),
            }),
            payment: None,
        }
    }

    /// Clears the lease and resets the assignment status to pending.
    pub fn clear_assignment() -> Self {
        Self {
            assignment: Some(AssignmentChange::Clear),
            payment: None,
        }
    }

    /// Marks the fine paid at `paid_at`.
    pub fn mark_paid(paid_at: DateTime<Utc>) -> Self {
        Self {
            assignment: None,
            payment: Some(PaymentChange {
                status: PaymentStatus::Paid,
                payment_date: Some(paid_at),
            }),
        }
    }

    /// Applies the patch to an in-memory fine.
    pub fn apply_to(&self, fine: &mut TrafficFine) {
        match &self.assignment {
            Some(AssignmentChange::Assign { lease_id }) => {
                fine.lease_id = Some(lease_id.clone());
                fine.assignment_status = AssignmentStatus::Assigned;
            }
            Some(AssignmentChange::Clear) => {
                fine.lease_id = None;
                fine.assignment_status = AssignmentStatus::Pending;
            }
            None => {}
        }
        if let Some(payment) = &self.payment {
            fine.payment_status = payment.status;
            fine.payment_date = payment.payment_date;
        }
    }
}

/// Read/write access to fines, vehicles, leases and validation logs.
///
/// Implementations wrap the hosted relational store. Every method is a
/// suspension point and may be wrapped in a timeout by the caller.
#[async_trait]
pub trait FineRepository: Send + Sync {
    /// Loads one fine.
    async fn get_fine(&self, fine_id: &str) -> StoreResult<Option<TrafficFine>>;

    /// Lists fines for a plate, optionally filtered by payment status.
    async fn fines_by_plate(
        &self,
        license_plate: &str,
        payment_status: Option<PaymentStatus>,
    ) -> StoreResult<Vec<TrafficFine>>;

    /// Lists fines with no lease association.
    async fn unassigned_fines(&self) -> StoreResult<Vec<TrafficFine>>;

    /// Lists assigned fines joined with their lease dates.
    async fn assigned_fines(&self) -> StoreResult<Vec<AssignedFine>>;

    /// Applies `patch` to one fine and returns the updated row.
    ///
    /// Returns [`StoreError::NotFound`](super::StoreError::NotFound) when no
    /// fine has that id.
    async fn update_fine(&self, fine_id: &str, patch: FinePatch) -> StoreResult<TrafficFine>;

    /// Lists vehicles with the plate, most recently created first.
    async fn vehicles_by_plate(&self, license_plate: &str) -> StoreResult<Vec<Vehicle>>;

    /// Lists leases for any of the vehicles, latest start date first.
    async fn leases_for_vehicles(&self, vehicle_ids: &[String]) -> StoreResult<Vec<Lease>>;

    /// Returns the most recent validation log entry for the plate.
    async fn latest_validation(&self, license_plate: &str)
    -> StoreResult<Option<ValidationLogEntry>>;

    /// Persists a validation result and returns the stored entry.
    async fn insert_validation(&self, result: &ValidationResult) -> StoreResult<ValidationLogEntry>;

    /// Lists validation log entries for the plate, newest first.
    async fn validation_history(&self, license_plate: &str) -> StoreResult<Vec<ValidationLogEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn create_test_fine() -> TrafficFine {
        TrafficFine {
            id: "fine_001".to_string(),
            violation_number: "V-1".to_string(),
            license_plate: "ABC123".to_string(),
            violation_date: Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap(),
            fine_amount: Decimal::new(15000, 2),
            violation_charge: "Parking".to_string(),
            payment_status: PaymentStatus::Pending,
            assignment_status: AssignmentStatus::Pending,
            lease_id: None,
            location: None,
            payment_date: None,
        }
    }

    #[test]
    fn test_assign_sets_both_fields() {
        let mut fine = create_test_fine();
        FinePatch::assign("lease_9").apply_to(&mut fine);
        assert_eq!(fine.lease_id.as_deref(), Some("lease_9"));
        assert_eq!(fine.assignment_status, AssignmentStatus::Assigned);
        assert!(fine.assignment_consistent());
    }

    #[test]
    fn test_clear_resets_both_fields() {
        let mut fine = create_test_fine();
        FinePatch::assign("lease_9").apply_to(&mut fine);
        FinePatch::clear_assignment().apply_to(&mut fine);
        assert!(fine.lease_id.is_none());
        assert_eq!(fine.assignment_status, AssignmentStatus::Pending);
    }

    #[test]
    fn test_mark_paid_leaves_assignment_untouched() {
        let mut fine = create_test_fine();
        FinePatch::assign("lease_9").apply_to(&mut fine);

        let paid_at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        FinePatch::mark_paid(paid_at).apply_to(&mut fine);

        assert_eq!(fine.payment_status, PaymentStatus::Paid);
        assert_eq!(fine.payment_date, Some(paid_at));
        assert_eq!(fine.lease_id.as_deref(), Some("lease_9"));
    }

    #[test]
    fn test_default_patch_is_noop() {
        let mut fine = create_test_fine();
        let before = fine.clone();
        FinePatch::default().apply_to(&mut fine);
        assert_eq!(fine, before);
    }
}
