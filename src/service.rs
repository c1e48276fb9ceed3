//! The reconciliation service facade.
//!
//! [`FineReconciler`] wires the repository, the violation authority, the
//! notifier and the pending-confirmation store together and exposes every
//! engine operation behind one handle. The HTTP layer holds it in an `Arc`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::authority::{HttpAuthority, ViolationAuthority};
use crate::batch::{FixedDelayThrottle, ProgressTracker, Throttle};
use crate::cleanup::{
    BulkAction, BulkReport, CleanupOptions, CleanupReport, bulk_process_fines,
    cleanup_invalid_assignments,
};
use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matching::{AssignmentOutcome, AutoAssignReport, assign_fine, auto_assign_unassigned};
use crate::models::{
    BatchProgress, PaymentStatus, PendingStatusUpdate, TrafficFine, ValidationLogEntry,
    ValidationResult,
};
use crate::notify::{Notification, Notifier, Severity, TracingNotifier};
use crate::pending::{ConfirmAllReport, PendingConfirmationStore};
use crate::store::FineRepository;
use crate::validation::{
    BatchOptions, BatchValidationOrchestrator, BatchValidationOutcome, SingleItemValidator,
};

/// Result of validating one fine by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualValidation {
    /// The fine that was checked.
    pub fine_id: String,
    /// The authority's answer for the fine's plate.
    pub result: ValidationResult,
    /// True when a "mark paid" update was queued for confirmation.
    pub queued_for_confirmation: bool,
}

/// Builds a [`FineReconciler`].
pub struct FineReconcilerBuilder {
    repository: Arc<dyn FineRepository>,
    authority: Arc<dyn ViolationAuthority>,
    config: ReconcilerConfig,
    notifier: Option<Arc<dyn Notifier>>,
    throttle: Option<Arc<dyn Throttle>>,
}

impl FineReconcilerBuilder {
    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sends notifications to `notifier` instead of `tracing`.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Paces batch validation with `throttle` instead of the configured delays.
    pub fn throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// Assembles the service.
    pub fn build(self) -> FineReconciler {
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotifier) as Arc<dyn Notifier>);
        let throttle = self.throttle.unwrap_or_else(|| {
            Arc::new(FixedDelayThrottle::from_config(&self.config.validation)) as Arc<dyn Throttle>
        });

        let validator = Arc::new(SingleItemValidator::new(
            self.authority,
            self.repository.clone(),
            self.config.validation.call_timeout(),
        ));
        let pending = Arc::new(PendingConfirmationStore::new(
            self.repository.clone(),
            notifier.clone(),
        ));
        let orchestrator = BatchValidationOrchestrator::new(
            validator.clone(),
            self.repository.clone(),
            notifier.clone(),
        )
        .with_throttle(throttle)
        .with_pending_store(pending.clone());

        FineReconciler {
            repository: self.repository,
            notifier,
            validator,
            orchestrator,
            pending,
            job_progress: Arc::new(ProgressTracker::new()),
            config: self.config,
        }
    }
}

/// Entry point for every reconciliation operation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fine_reconciler::authority::ScriptedAuthority;
/// use fine_reconciler::batch::NoDelay;
/// use fine_reconciler::service::FineReconciler;
/// use fine_reconciler::store::MemoryStore;
///
/// let reconciler = FineReconciler::builder(
///     Arc::new(MemoryStore::new()),
///     Arc::new(ScriptedAuthority::new().with_fine("ABC123")),
/// )
/// .throttle(Arc::new(NoDelay))
/// .build();
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let outcome = rt
///     .block_on(reconciler.validate_batch(&["ABC123".to_string()], None))
///     .unwrap();
/// assert_eq!(outcome.summary.succeeded, 1);
/// assert!(outcome.results[0].has_fine);
/// ```
pub struct FineReconciler {
    repository: Arc<dyn FineRepository>,
    notifier: Arc<dyn Notifier>,
    validator: Arc<SingleItemValidator>,
    orchestrator: BatchValidationOrchestrator,
    pending: Arc<PendingConfirmationStore>,
    job_progress: Arc<ProgressTracker>,
    config: ReconcilerConfig,
}

impl FineReconciler {
    /// Starts building a service over `repository` and `authority`.
    pub fn builder(
        repository: Arc<dyn FineRepository>,
        authority: Arc<dyn ViolationAuthority>,
    ) -> FineReconcilerBuilder {
        FineReconcilerBuilder {
            repository,
            authority,
            config: ReconcilerConfig::default(),
            notifier: None,
            throttle: None,
        }
    }

    /// Starts building a service that queries the HTTP authority named in
    /// `config.authority`.
    ///
    /// Fails with [`ReconcileError::AuthorityNotConfigured`] when the section
    /// is absent.
    pub fn from_config(
        repository: Arc<dyn FineRepository>,
        config: ReconcilerConfig,
    ) -> ReconcileResult<FineReconcilerBuilder> {
        let settings = config
            .authority
            .as_ref()
            .ok_or(ReconcileError::AuthorityNotConfigured)?;
        let authority = HttpAuthority::new(settings)?;
        Ok(Self::builder(repository, Arc::new(authority)).config(config))
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// The shared pending-confirmation store.
    pub fn pending_store(&self) -> &Arc<PendingConfirmationStore> {
        &self.pending
    }

    /// Validates many plates. `None` uses the configured options.
    pub async fn validate_batch(
        &self,
        license_plates: &[String],
        options: Option<BatchOptions>,
    ) -> ReconcileResult<BatchValidationOutcome> {
        let options = options.unwrap_or_else(|| BatchOptions::from(&self.config.validation));
        self.orchestrator.validate_batch(license_plates, options).await
    }

    /// Progress of the current or last batch validation.
    pub fn validation_progress(&self) -> BatchProgress {
        self.orchestrator.progress()
    }

    /// Progress of the current or last cleanup or bulk job.
    pub fn job_progress(&self) -> BatchProgress {
        self.job_progress.snapshot()
    }

    /// Validates the plate of one fine.
    ///
    /// When the authority no longer lists a fine for the plate and the fine
    /// is still `pending`, a "mark paid" update is queued for confirmation.
    /// The fine itself is never changed here.
    pub async fn validate_fine(&self, fine_id: &str) -> ReconcileResult<ManualValidation> {
        let fine = self.load_fine(fine_id).await?;
        let result = self.validator.validate_traffic_fine(&fine.license_plate).await?;

        let queue = !result.has_fine && fine.payment_status == PaymentStatus::Pending;
        if queue {
            self.pending
                .add_pending_update(PendingStatusUpdate {
                    fine_id: fine.id.clone(),
                    license_plate: result.license_plate.clone(),
                    validation_result: result.clone(),
                    timestamp: result.validated_at,
                })
                .await;
        }

        Ok(ManualValidation {
            fine_id: fine.id,
            result,
            queued_for_confirmation: queue,
        })
    }

    /// Assigns one fine to its best matching lease.
    pub async fn assign_fine(&self, fine_id: &str) -> ReconcileResult<AssignmentOutcome> {
        assign_fine(self.repository.as_ref(), fine_id).await
    }

    /// Tries to assign every unassigned fine.
    pub async fn auto_assign_unassigned(&self) -> ReconcileResult<AutoAssignReport> {
        let report = auto_assign_unassigned(self.repository.as_ref()).await?;
        let severity = if report.failed > 0 {
            Severity::Warning
        } else {
            Severity::Success
        };
        self.notifier.notify(Notification::new(
            severity,
            "Auto-assignment complete",
            format!(
                "Assigned {} of {} fine(s); {} without a matching lease, {} failed",
                report.assigned, report.scanned, report.unmatched, report.failed
            ),
        ));
        Ok(report)
    }

    /// Clears stored assignments that fail the date check. `None` uses the
    /// configured options.
    pub async fn cleanup_invalid_assignments(
        &self,
        options: Option<CleanupOptions>,
    ) -> ReconcileResult<CleanupReport> {
        let options = options.unwrap_or_else(|| CleanupOptions::from(&self.config.cleanup));
        let report =
            cleanup_invalid_assignments(self.repository.as_ref(), &self.job_progress, options)
                .await?;

        let severity = if report.invalid == 0 {
            Severity::Info
        } else if report.failed == 0 {
            Severity::Success
        } else if report.cleaned > 0 {
            Severity::Warning
        } else {
            Severity::Error
        };
        self.notifier
            .notify(Notification::new(severity, "Assignment cleanup", report.message.clone()));
        Ok(report)
    }

    /// Applies a bulk action to the listed fines.
    pub async fn bulk_process_fines(
        &self,
        fine_ids: &[String],
        action: BulkAction,
    ) -> ReconcileResult<BulkReport> {
        let options = CleanupOptions::from(&self.config.cleanup);
        let report = bulk_process_fines(
            self.repository.as_ref(),
            &self.job_progress,
            fine_ids,
            action,
            options,
        )
        .await?;

        let severity = match (report.succeeded, report.failed) {
            (_, 0) => Severity::Success,
            (0, _) => Severity::Error,
            _ => Severity::Warning,
        };
        self.notifier.notify(Notification::new(
            severity,
            "Bulk action complete",
            format!(
                "{}: {} of {} fine(s) updated",
                action, report.succeeded, report.processed
            ),
        ));
        Ok(report)
    }

    /// Persisted validation log for a plate, newest first.
    pub async fn validation_history(
        &self,
        license_plate: &str,
    ) -> ReconcileResult<Vec<ValidationLogEntry>> {
        let plate = license_plate.trim();
        if plate.is_empty() {
            return Err(ReconcileError::BlankLicensePlate);
        }
        Ok(self.repository.validation_history(plate).await?)
    }

    /// All queued status updates.
    pub async fn list_pending(&self) -> Vec<PendingStatusUpdate> {
        self.pending.list().await
    }

    /// Commits one queued update.
    pub async fn confirm_status_update(&self, fine_id: &str) -> ReconcileResult<TrafficFine> {
        self.pending.confirm_status_update(fine_id).await
    }

    /// Commits every queued update.
    pub async fn confirm_all_status_updates(&self) -> ConfirmAllReport {
        self.pending.confirm_all_status_updates().await
    }

    /// Discards one queued update.
    pub async fn dismiss_status_update(
        &self,
        fine_id: &str,
    ) -> ReconcileResult<PendingStatusUpdate> {
        self.pending.dismiss_status_update(fine_id).await
    }

    /// Discards every queued update and returns how many there were.
    pub async fn dismiss_all_status_updates(&self) -> usize {
        self.pending.dismiss_all_status_updates().await
    }

    async fn load_fine(&self, fine_id: &str) -> ReconcileResult<TrafficFine> {
        self.repository
            .get_fine(fine_id)
            .await?
            .ok_or_else(|| ReconcileError::FineNotFound {
                fine_id: fine_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::ScriptedAuthority;
    use crate::batch::NoDelay;
    use crate::config::AuthorityConfig;
    use crate::models::{AssignmentStatus, Lease, Vehicle};
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn fine(id: &str, plate: &str, status: PaymentStatus) -> TrafficFine {
        TrafficFine {
            id: id.to_string(),
            violation_number: format!("V-{}", id),
            license_plate: plate.to_string(),
            violation_date: date(2025, 3, 10),
            fine_amount: Decimal::new(12000, 2),
            violation_charge: "Speeding".to_string(),
            payment_status: status,
            assignment_status: AssignmentStatus::Pending,
            lease_id: None,
            location: None,
            payment_date: None,
        }
    }

    fn reconciler(
        store: Arc<MemoryStore>,
        authority: ScriptedAuthority,
    ) -> (FineReconciler, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let reconciler = FineReconciler::builder(store, Arc::new(authority))
            .notifier(notifier.clone())
            .throttle(Arc::new(NoDelay))
            .build();
        (reconciler, notifier)
    }

    #[tokio::test]
    async fn test_validate_fine_queues_when_authority_clears_plate() {
        let store = Arc::new(MemoryStore::seeded(
            vec![fine("f1", "CLEAR", PaymentStatus::Pending)],
            vec![],
            vec![],
        ));
        let (reconciler, _) = reconciler(store.clone(), ScriptedAuthority::new());

        let manual = reconciler.validate_fine("f1").await.unwrap();
        assert!(manual.queued_for_confirmation);
        assert_eq!(reconciler.list_pending().await.len(), 1);
        assert_eq!(
            store.get_fine("f1").await.unwrap().unwrap().payment_status,
            PaymentStatus::Pending
        );

        let confirmed = reconciler.confirm_status_update("f1").await.unwrap();
        assert_eq!(confirmed.payment_status, PaymentStatus::Paid);
        assert!(reconciler.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_validate_fine_does_not_queue_when_fine_outstanding() {
        let store = Arc::new(MemoryStore::seeded(
            vec![fine("f1", "OWING", PaymentStatus::Pending)],
            vec![],
            vec![],
        ));
        let (reconciler, _) = reconciler(store, ScriptedAuthority::new().with_fine("OWING"));

        let manual = reconciler.validate_fine("f1").await.unwrap();
        assert!(manual.result.has_fine);
        assert!(!manual.queued_for_confirmation);
        assert!(reconciler.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_validate_fine_skips_already_paid() {
        let store = Arc::new(MemoryStore::seeded(
            vec![fine("f1", "CLEAR", PaymentStatus::Paid)],
            vec![],
            vec![],
        ));
        let (reconciler, _) = reconciler(store, ScriptedAuthority::new());
        assert!(!reconciler.validate_fine("f1").await.unwrap().queued_for_confirmation);
    }

    #[tokio::test]
    async fn test_validate_unknown_fine() {
        let (reconciler, _) = reconciler(Arc::new(MemoryStore::new()), ScriptedAuthority::new());
        assert!(matches!(
            reconciler.validate_fine("nope").await,
            Err(ReconcileError::FineNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_assign_then_cleanup_keeps_valid_assignment() {
        let store = Arc::new(MemoryStore::seeded(
            vec![fine("f1", "ABC", PaymentStatus::Pending)],
            vec![Vehicle {
                id: "v1".to_string(),
                license_plate: "ABC".to_string(),
                created_at: date(2024, 1, 1),
            }],
            vec![Lease {
                id: "l1".to_string(),
                vehicle_id: "v1".to_string(),
                customer_id: "c1".to_string(),
                start_date: date(2025, 3, 1),
                end_date: Some(date(2025, 3, 31)),
            }],
        ));
        let (reconciler, notifier) = reconciler(store, ScriptedAuthority::new());

        let outcome = reconciler.assign_fine("f1").await.unwrap();
        assert_eq!(outcome.lease_id.as_deref(), Some("l1"));

        let report = reconciler.cleanup_invalid_assignments(None).await.unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.invalid, 0);
        assert_eq!(notifier.last().unwrap().severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_bulk_notifies_by_outcome() {
        let store = Arc::new(MemoryStore::seeded(
            vec![fine("f1", "ABC", PaymentStatus::Pending)],
            vec![],
            vec![],
        ));
        let (reconciler, notifier) = reconciler(store, ScriptedAuthority::new());

        let ids = vec!["f1".to_string(), "ghost".to_string()];
        let report = reconciler.bulk_process_fines(&ids, BulkAction::MarkPaid).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(notifier.last().unwrap().severity, Severity::Warning);
        assert_eq!(reconciler.job_progress().processed, 2);
    }

    #[test]
    fn test_from_config_requires_authority_section() {
        let result = FineReconciler::from_config(
            Arc::new(MemoryStore::new()),
            ReconcilerConfig::default(),
        );
        assert!(matches!(result, Err(ReconcileError::AuthorityNotConfigured)));
    }

    #[test]
    fn test_from_config_keeps_loaded_settings() {
        let mut config = ReconcilerConfig::default();
        config.validation.batch_size = 7;
        config.authority = Some(AuthorityConfig {
            base_url: "http://localhost:9/".to_string(),
            timeout_ms: 500,
        });

        let reconciler = FineReconciler::from_config(Arc::new(MemoryStore::new()), config)
            .unwrap()
            .throttle(Arc::new(NoDelay))
            .build();
        assert_eq!(reconciler.config().validation.batch_size, 7);
        assert_eq!(
            reconciler.config().authority.as_ref().unwrap().timeout_ms,
            500
        );
    }

    #[tokio::test]
    async fn test_dismiss_all_returns_count() {
        let store = Arc::new(MemoryStore::seeded(
            vec![
                fine("f1", "CLEAR", PaymentStatus::Pending),
                fine("f2", "CLEAR", PaymentStatus::Pending),
            ],
            vec![],
            vec![],
        ));
        let (reconciler, _) = reconciler(store, ScriptedAuthority::new());
        reconciler.validate_fine("f1").await.unwrap();
        reconciler.validate_fine("f2").await.unwrap();

        assert_eq!(reconciler.dismiss_all_status_updates().await, 2);
        assert!(reconciler.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_history_rejects_blank_plate() {
        let (reconciler, _) = reconciler(Arc::new(MemoryStore::new()), ScriptedAuthority::new());
        assert!(matches!(
            reconciler.validation_history(" ").await,
            Err(ReconcileError::BlankLicensePlate)
        ));
    }
}
