//! Batch validation of many license plates.
//!
//! Drives the [`SingleItemValidator`] through the bounded batch executor,
//! collects and classifies failures, and reports one of three outcomes:
//! all succeeded, partial success, or total failure.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{BatchPlan, FixedDelayThrottle, ProgressTracker, Throttle, run_batched};
use crate::config::ValidationConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{
    BatchProgress, ErrorCode, PaymentStatus, PendingStatusUpdate, ValidationError,
    ValidationResult,
};
use crate::notify::{Notification, Notifier, Severity};
use crate::pending::PendingConfirmationStore;
use crate::store::FineRepository;

use super::classifier::{map_to_validation_error, summarize_errors};
use super::single::SingleItemValidator;

/// Per-call options for [`BatchValidationOrchestrator::validate_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Plates per sequential batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum authority calls in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Collect failures instead of aborting on the first one.
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
}

fn default_batch_size() -> usize {
    ValidationConfig::default().batch_size
}

fn default_concurrency() -> usize {
    ValidationConfig::default().concurrency
}

fn default_continue_on_error() -> bool {
    true
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&ValidationConfig::default())
    }
}

impl From<&ValidationConfig> for BatchOptions {
    fn from(config: &ValidationConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            continue_on_error: config.continue_on_error,
        }
    }
}

/// Which of the mutually exclusive outcomes a batch reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Nothing to validate.
    Empty,
    /// Every plate validated.
    AllSucceeded,
    /// Some plates validated, some failed.
    PartialSuccess,
    /// No plate validated.
    TotalFailure,
}

impl BatchOutcome {
    /// Notification severity for the outcome. `None` for empty batches.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            BatchOutcome::Empty => None,
            BatchOutcome::AllSucceeded => Some(Severity::Success),
            BatchOutcome::PartialSuccess => Some(Severity::Warning),
            BatchOutcome::TotalFailure => Some(Severity::Error),
        }
    }
}

/// Counts and wording for a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Plates submitted.
    pub total: usize,
    /// Plates validated.
    pub succeeded: usize,
    /// Plates that failed.
    pub failed: usize,
    /// The outcome tier.
    pub outcome: BatchOutcome,
    /// One-line grouped error summary, empty when nothing failed.
    pub error_summary: String,
    /// Human-readable summary.
    pub message: String,
}

impl BatchSummary {
    fn from_counts(total: usize, errors: &[ValidationError], succeeded: usize) -> Self {
        let failed = errors.len();
        let error_summary = summarize_errors(errors);
        let (outcome, message) = if total == 0 {
            (BatchOutcome::Empty, "No license plates to validate".to_string())
        } else if failed == 0 {
            (
                BatchOutcome::AllSucceeded,
                format!("Validated {} license plate(s) successfully", succeeded),
            )
        } else if succeeded > 0 {
            (
                BatchOutcome::PartialSuccess,
                format!(
                    "Validated {} of {} license plate(s); {} failed. {}",
                    succeeded, total, failed, error_summary
                ),
            )
        } else {
            (
                BatchOutcome::TotalFailure,
                format!(
                    "All {} license plate(s) failed validation. {}",
                    failed, error_summary
                ),
            )
        };
        Self {
            total,
            succeeded,
            failed,
            outcome,
            error_summary,
            message,
        }
    }
}

/// Everything a batch validation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchValidationOutcome {
    /// Successful validations, in no particular order.
    pub results: Vec<ValidationResult>,
    /// Classified failures, in no particular order.
    pub errors: Vec<ValidationError>,
    /// Counts and wording.
    pub summary: BatchSummary,
}

/// Validates lists of plates under bounded concurrency.
pub struct BatchValidationOrchestrator {
    validator: Arc<SingleItemValidator>,
    repository: Arc<dyn FineRepository>,
    notifier: Arc<dyn Notifier>,
    throttle: Arc<dyn Throttle>,
    progress: Arc<ProgressTracker>,
    pending: Option<Arc<PendingConfirmationStore>>,
}

impl BatchValidationOrchestrator {
    /// Creates an orchestrator with the default fixed-delay pacing.
    pub fn new(
        validator: Arc<SingleItemValidator>,
        repository: Arc<dyn FineRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            validator,
            repository,
            notifier,
            throttle: Arc::new(FixedDelayThrottle::default()),
            progress: Arc::new(ProgressTracker::new()),
            pending: None,
        }
    }

    /// Replaces the pacing strategy.
    pub fn with_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Routes "no fine found" results for pending fines to `pending`.
    pub fn with_pending_store(mut self, pending: Arc<PendingConfirmationStore>) -> Self {
        self.pending = Some(pending);
        self
    }

    /// Returns the live progress of the current or last batch.
    pub fn progress(&self) -> BatchProgress {
        self.progress.snapshot()
    }

    /// Validates every plate in `license_plates`.
    ///
    /// With `continue_on_error` set, failures are collected and classified.
    /// Otherwise the first failure aborts the call with
    /// [`ReconcileError::BatchAborted`]. Results carry no ordering relative
    /// to the input; correlate by license plate.
    pub async fn validate_batch(
        &self,
        license_plates: &[String],
        options: BatchOptions,
    ) -> ReconcileResult<BatchValidationOutcome> {
        if license_plates.is_empty() {
            self.progress.reset(0);
            return Ok(BatchValidationOutcome {
                results: Vec::new(),
                errors: Vec::new(),
                summary: BatchSummary::from_counts(0, &[], 0),
            });
        }

        info!(
            plates = license_plates.len(),
            batch_size = options.batch_size,
            concurrency = options.concurrency,
            continue_on_error = options.continue_on_error,
            "starting batch validation"
        );

        let plan = BatchPlan::new(options.batch_size, options.concurrency)
            .stop_on_error(!options.continue_on_error);
        let validator = &self.validator;
        let run = run_batched(
            license_plates.to_vec(),
            plan,
            self.throttle.as_ref(),
            &self.progress,
            move |plate: String| async move { validator.validate_traffic_fine(&plate).await },
        )
        .await;

        let processed = run.outcomes.len();
        let aborted = run.aborted;
        let mut results = Vec::new();
        let mut errors = Vec::new();
        for (plate, outcome) in run.outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => errors.push(map_to_validation_error(&error, &plate)),
            }
        }

        if aborted {
            // The executor only aborts after recording a failure.
            let first = errors.into_iter().next().unwrap_or_else(|| {
                ValidationError::new(ErrorCode::Validation, "batch aborted", String::new())
            });
            self.notifier.notify(Notification::new(
                Severity::Error,
                "Batch validation aborted",
                format!("Stopped after {} plate(s): {}", processed, first.message),
            ));
            return Err(ReconcileError::BatchAborted {
                processed,
                error: first,
            });
        }

        self.queue_paid_inferences(&results).await;

        let summary = BatchSummary::from_counts(license_plates.len(), &errors, results.len());
        if let Some(severity) = summary.outcome.severity() {
            self.notifier.notify(Notification::new(
                severity,
                "Batch validation complete",
                summary.message.clone(),
            ));
        }
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            outcome = ?summary.outcome,
            "batch validation finished"
        );

        Ok(BatchValidationOutcome {
            results,
            errors,
            summary,
        })
    }

    async fn queue_paid_inferences(&self, results: &[ValidationResult]) {
        let Some(pending) = &self.pending else {
            return;
        };

        let deadline = self.validator.call_timeout();
        for result in results.iter().filter(|r| !r.has_fine) {
            let lookup = self
                .repository
                .fines_by_plate(&result.license_plate, Some(PaymentStatus::Pending));
            let fines = match tokio::time::timeout(deadline, lookup).await {
                Ok(Ok(fines)) => fines,
                Ok(Err(error)) => {
                    warn!(
                        license_plate = %result.license_plate,
                        error = %error,
                        "could not load pending fines for plate"
                    );
                    continue;
                }
                Err(_) => {
                    warn!(
                        license_plate = %result.license_plate,
                        timeout_ms = deadline.as_millis() as u64,
                        "pending fine lookup timed out"
                    );
                    continue;
                }
            };

            for fine in fines {
                pending
                    .add_pending_update(PendingStatusUpdate {
                        fine_id: fine.id,
                        license_plate: result.license_plate.clone(),
                        validation_result: result.clone(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
        }
    }
}
