//! Human confirmation gate for inferred payment-status changes.
//!
//! When the authority stops listing a fine, the engine infers that it was
//! paid. That inference is queued here and only committed when a person
//! confirms it. The queue lives in process memory and is lost on restart.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{PendingStatusUpdate, TrafficFine};
use crate::notify::{Notification, Notifier, Severity};
use crate::store::{FinePatch, FineRepository};

/// Result of confirming one queued update during a confirm-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationOutcome {
    /// The fine that was confirmed.
    pub fine_id: String,
    /// Plate on the fine.
    pub license_plate: String,
    /// Whether the fine was marked paid.
    pub success: bool,
    /// Failure description when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a confirm-all run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmAllReport {
    /// Per-update outcomes, in queue order.
    pub results: Vec<ConfirmationOutcome>,
    /// Updates that were committed.
    pub succeeded: usize,
    /// Updates that failed to commit.
    pub failed: usize,
}

/// Queue of payment-status updates awaiting confirmation.
///
/// Holds at most one update per fine. The store is shared by the
/// orchestrator and the API, so it is passed around explicitly.
pub struct PendingConfirmationStore {
    entries: Mutex<Vec<PendingStatusUpdate>>,
    repository: Arc<dyn FineRepository>,
    notifier: Arc<dyn Notifier>,
}

impl PendingConfirmationStore {
    /// Creates an empty store.
    pub fn new(repository: Arc<dyn FineRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            repository,
            notifier,
        }
    }

    /// Queues `update`, replacing any earlier update for the same fine.
    pub async fn add_pending_update(&self, update: PendingStatusUpdate) {
        let fine_id = update.fine_id.clone();
        let license_plate = update.license_plate.clone();
        {
            let mut entries = self.entries.lock().await;
            entries.retain(|e| e.fine_id != update.fine_id);
            entries.push(update);
        }

        info!(fine_id = %fine_id, license_plate = %license_plate, "queued pending status update");
        self.notifier.notify(Notification::new(
            Severity::Info,
            "Status update pending",
            format!(
                "No outstanding fine found for {}; confirm to mark fine {} as paid",
                license_plate, fine_id
            ),
        ));
    }

    /// Returns all queued updates in insertion order.
    pub async fn list(&self) -> Vec<PendingStatusUpdate> {
        self.entries.lock().await.clone()
    }

    /// Returns the queued update for `fine_id`, if any.
    pub async fn get(&self, fine_id: &str) -> Option<PendingStatusUpdate> {
        self.entries
            .lock()
            .await
            .iter()
            .find(|e| e.fine_id == fine_id)
            .cloned()
    }

    /// Number of queued updates.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns true when nothing is queued.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Marks the fine paid and removes its queued update.
    ///
    /// Fails with [`ReconcileError::PendingUpdateNotFound`] when nothing is
    /// queued for the fine. If the write fails the update stays queued.
    pub async fn confirm_status_update(&self, fine_id: &str) -> ReconcileResult<TrafficFine> {
        let pending = self
            .get(fine_id)
            .await
            .ok_or_else(|| ReconcileError::PendingUpdateNotFound {
                fine_id: fine_id.to_string(),
            })?;

        let fine = self.commit(&pending).await?;
        self.entries.lock().await.retain(|e| e.fine_id != fine_id);

        info!(fine_id = %fine_id, "confirmed pending status update");
        self.notifier.notify(Notification::new(
            Severity::Success,
            "Fine marked as paid",
            format!("Fine {} ({}) marked as paid", fine_id, pending.license_plate),
        ));
        Ok(fine)
    }

    /// Commits every queued update one by one, then empties the queue.
    ///
    /// Individual failures are recorded in the report and do not stop the
    /// run. The queue is cleared whatever the outcomes.
    pub async fn confirm_all_status_updates(&self) -> ConfirmAllReport {
        let queued = std::mem::take(&mut *self.entries.lock().await);
        let mut report = ConfirmAllReport::default();

        for pending in &queued {
            let outcome = match self.commit(pending).await {
                Ok(_) => {
                    report.succeeded += 1;
                    ConfirmationOutcome {
                        fine_id: pending.fine_id.clone(),
                        license_plate: pending.license_plate.clone(),
                        success: true,
                        error: None,
                    }
                }
                Err(error) => {
                    report.failed += 1;
                    warn!(
                        fine_id = %pending.fine_id,
                        error = %error,
                        "failed to confirm status update"
                    );
                    ConfirmationOutcome {
                        fine_id: pending.fine_id.clone(),
                        license_plate: pending.license_plate.clone(),
                        success: false,
                        error: Some(error.to_string()),
                    }
                }
            };
            report.results.push(outcome);
        }

        if !queued.is_empty() {
            self.notifier.notify(confirm_all_notification(&report));
        }
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "confirmed all pending status updates"
        );
        report
    }

    /// Discards the queued update for `fine_id` without touching the fine.
    pub async fn dismiss_status_update(
        &self,
        fine_id: &str,
    ) -> ReconcileResult<PendingStatusUpdate> {
        let mut entries = self.entries.lock().await;
        let position = entries
            .iter()
            .position(|e| e.fine_id == fine_id)
            .ok_or_else(|| ReconcileError::PendingUpdateNotFound {
                fine_id: fine_id.to_string(),
            })?;
        let dismissed = entries.remove(position);
        info!(fine_id = %fine_id, "dismissed pending status update");
        Ok(dismissed)
    }

    /// Discards every queued update and returns how many there were.
    pub async fn dismiss_all_status_updates(&self) -> usize {
        let dismissed = std::mem::take(&mut *self.entries.lock().await).len();
        info!(dismissed, "dismissed all pending status updates");
        dismissed
    }

    async fn commit(&self, pending: &PendingStatusUpdate) -> ReconcileResult<TrafficFine> {
        let fine = self
            .repository
            .update_fine(&pending.fine_id, FinePatch::mark_paid(Utc::now()))
            .await?;
        Ok(fine)
    }
}

fn confirm_all_notification(report: &ConfirmAllReport) -> Notification {
    if report.failed == 0 {
        Notification::new(
            Severity::Success,
            "Status updates confirmed",
            format!("{} fine(s) marked as paid", report.succeeded),
        )
    } else if report.succeeded > 0 {
        Notification::new(
            Severity::Warning,
            "Status updates partially confirmed",
            format!(
                "{} fine(s) marked as paid, {} failed",
                report.succeeded, report.failed
            ),
        )
    } else {
        Notification::new(
            Severity::Error,
            "Status updates failed",
            format!("{} update(s) could not be applied", report.failed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentStatus, PaymentStatus, ValidationResult};
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn create_fine(id: &str, plate: &str) -> TrafficFine {
        TrafficFine {
            id: id.to_string(),
            violation_number: format!("V-{}", id),
            license_plate: plate.to_string(),
            violation_date: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            fine_amount: Decimal::new(20000, 2),
            violation_charge: "Speeding".to_string(),
            payment_status: PaymentStatus::Pending,
            assignment_status: AssignmentStatus::Pending,
            lease_id: None,
            location: None,
            payment_date: None,
        }
    }

    fn pending(fine_id: &str, plate: &str, details: &str) -> PendingStatusUpdate {
        PendingStatusUpdate {
            fine_id: fine_id.to_string(),
            license_plate: plate.to_string(),
            validation_result: ValidationResult {
                license_plate: plate.to_string(),
                validated_at: Utc::now(),
                validation_source: "test".to_string(),
                has_fine: false,
                details: details.to_string(),
            },
            timestamp: Utc::now(),
        }
    }

    fn setup(
        fines: Vec<TrafficFine>,
    ) -> (Arc<MemoryStore>, Arc<MemoryNotifier>, PendingConfirmationStore) {
        let store = Arc::new(MemoryStore::seeded(fines, vec![], vec![]));
        let notifier = Arc::new(MemoryNotifier::new());
        let pending = PendingConfirmationStore::new(store.clone(), notifier.clone());
        (store, notifier, pending)
    }

    #[tokio::test]
    async fn test_add_replaces_existing_entry_for_same_fine() {
        let (_, notifier, store) = setup(vec![]);
        store.add_pending_update(pending("f1", "ABC", "first")).await;
        store.add_pending_update(pending("f1", "ABC", "second")).await;

        let entries = store.list().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].validation_result.details, "second");
        assert_eq!(notifier.notifications().len(), 2);
        assert_eq!(notifier.last().unwrap().severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_confirm_marks_paid_and_removes() {
        let (repo, _, store) = setup(vec![create_fine("f1", "ABC")]);
        store.add_pending_update(pending("f1", "ABC", "")).await;

        let fine = store.confirm_status_update("f1").await.unwrap();
        assert_eq!(fine.payment_status, PaymentStatus::Paid);
        assert!(fine.payment_date.is_some());
        assert!(store.is_empty().await);

        let stored = repo.get_fine("f1").await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_confirm_unknown_fine_fails() {
        let (_, _, store) = setup(vec![]);
        let result = store.confirm_status_update("nope").await;
        assert!(matches!(
            result,
            Err(ReconcileError::PendingUpdateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_confirm_keeps_entry() {
        let (repo, _, store) = setup(vec![create_fine("f1", "ABC")]);
        repo.reject_updates_for("f1").await;
        store.add_pending_update(pending("f1", "ABC", "")).await;

        assert!(store.confirm_status_update("f1").await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_confirm_all_tolerates_failures_and_clears() {
        let (repo, notifier, store) =
            setup(vec![create_fine("f1", "ABC"), create_fine("f2", "XYZ")]);
        repo.reject_updates_for("f2").await;
        store.add_pending_update(pending("f1", "ABC", "")).await;
        store.add_pending_update(pending("f2", "XYZ", "")).await;
        store.add_pending_update(pending("missing", "QQQ", "")).await;

        let report = store.confirm_all_status_updates().await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].success);
        assert!(report.results[1].error.is_some());
        assert!(store.is_empty().await);
        assert_eq!(notifier.last().unwrap().severity, Severity::Warning);

        assert_eq!(
            repo.get_fine("f1").await.unwrap().unwrap().payment_status,
            PaymentStatus::Paid
        );
        assert_eq!(
            repo.get_fine("f2").await.unwrap().unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_replaced_entry_then_confirm_all_marks_paid() {
        let (repo, _, store) = setup(vec![create_fine("f1", "ABC")]);
        store.add_pending_update(pending("f1", "ABC", "old")).await;
        store.add_pending_update(pending("f1", "ABC", "new")).await;
        assert_eq!(store.len().await, 1);

        let report = store.confirm_all_status_updates().await;
        assert_eq!(report.succeeded, 1);
        assert!(store.is_empty().await);
        assert_eq!(
            repo.get_fine("f1").await.unwrap().unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_dismiss_does_not_touch_fine() {
        let (repo, _, store) = setup(vec![create_fine("f1", "ABC"), create_fine("f2", "ABC")]);
        store.add_pending_update(pending("f1", "ABC", "")).await;
        store.add_pending_update(pending("f2", "ABC", "")).await;

        let dismissed = store.dismiss_status_update("f1").await.unwrap();
        assert_eq!(dismissed.fine_id, "f1");
        assert!(store.dismiss_status_update("f1").await.is_err());
        assert_eq!(store.dismiss_all_status_updates().await, 1);
        assert!(store.is_empty().await);

        for id in ["f1", "f2"] {
            assert_eq!(
                repo.get_fine(id).await.unwrap().unwrap().payment_status,
                PaymentStatus::Pending
            );
        }
    }

    #[tokio::test]
    async fn test_confirm_all_on_empty_store_is_silent() {
        let (_, notifier, store) = setup(vec![]);
        let report = store.confirm_all_status_updates().await;
        assert_eq!(report, ConfirmAllReport::default());
        assert!(notifier.notifications().is_empty());
    }
}
