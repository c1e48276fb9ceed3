//! Repair of fine-to-lease assignments that no longer hold.
//!
//! Stored assignments are re-checked with the same interval rule used to
//! create them. Fines whose violation date falls outside their lease are
//! unassigned in bounded batches. A second run over repaired data finds
//! nothing to do.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{BatchPlan, NoDelay, ProgressTracker, run_batched};
use crate::config::CleanupConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::matching::validate_fine_date_at;
use crate::models::{AssignedFine, TrafficFine};
use crate::store::{FinePatch, FineRepository};

/// Bounded-execution settings shared by cleanup and bulk jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOptions {
    /// Fines per sequential batch.
    pub batch_size: usize,
    /// Maximum writes in flight.
    pub concurrency: usize,
    /// Deadline for one store write.
    #[serde(with = "millis")]
    pub write_timeout: Duration,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::from(&CleanupConfig::default())
    }
}

impl From<&CleanupConfig> for CleanupOptions {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            concurrency: config.concurrency,
            write_timeout: config.call_timeout(),
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// An assigned fine whose stored lease no longer covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidAssignment {
    /// The fine to unassign.
    pub fine_id: String,
    /// The lease it is currently assigned to.
    pub lease_id: String,
    /// Why the assignment is invalid.
    pub reason: String,
}

/// Totals for one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Assigned fines examined.
    pub scanned: usize,
    /// Assignments found invalid.
    pub invalid: usize,
    /// Assignments cleared.
    pub cleaned: usize,
    /// Clears that failed or timed out.
    pub failed: usize,
    /// Human-readable summary.
    pub message: String,
}

/// Returns the assignments in `assigned` that fail the date check.
///
/// An assignment whose lease has disappeared (no stored start date) is
/// invalid.
pub fn find_invalid_assignments(
    assigned: &[AssignedFine],
    now: DateTime<Utc>,
) -> Vec<InvalidAssignment> {
    assigned
        .iter()
        .filter_map(|fine| {
            let reason = match fine.lease_start {
                None => Some(format!("lease {} no longer exists", fine.lease_id)),
                Some(start) => {
                    validate_fine_date_at(fine.violation_date, start, fine.lease_end, now).reason
                }
            }?;
            Some(InvalidAssignment {
                fine_id: fine.fine_id.clone(),
                lease_id: fine.lease_id.clone(),
                reason,
            })
        })
        .collect()
}

/// Clears every assignment that fails the date check.
///
/// Writes run in bounded batches with no pacing delay. A failed or timed out
/// write is logged and counted and the run carries on.
pub async fn cleanup_invalid_assignments(
    repository: &dyn FineRepository,
    progress: &ProgressTracker,
    options: CleanupOptions,
) -> ReconcileResult<CleanupReport> {
    cleanup_invalid_assignments_at(repository, progress, options, Utc::now()).await
}

/// Same as [`cleanup_invalid_assignments`], with an explicit "now" for open leases.
pub async fn cleanup_invalid_assignments_at(
    repository: &dyn FineRepository,
    progress: &ProgressTracker,
    options: CleanupOptions,
    now: DateTime<Utc>,
) -> ReconcileResult<CleanupReport> {
    let assigned = repository.assigned_fines().await?;
    let invalid = find_invalid_assignments(&assigned, now);

    if invalid.is_empty() {
        progress.reset(0);
        info!(scanned = assigned.len(), "no invalid assignments found");
        return Ok(CleanupReport {
            scanned: assigned.len(),
            message: "No invalid assignments found".to_string(),
            ..CleanupReport::default()
        });
    }

    info!(
        scanned = assigned.len(),
        invalid = invalid.len(),
        "clearing invalid assignments"
    );

    let plan = BatchPlan::new(options.batch_size, options.concurrency);
    let timeout = options.write_timeout;
    let clear = move |item: InvalidAssignment| async move {
        let patch = FinePatch::clear_assignment();
        let result = update_with_timeout(repository, &item.fine_id, patch, timeout).await;
        if let Err(error) = &result {
            warn!(
                fine_id = %item.fine_id,
                lease_id = %item.lease_id,
                error = %error,
                "failed to clear assignment"
            );
        }
        result
    };
    let run = run_batched(invalid, plan, &NoDelay, progress, clear).await;

    let report = CleanupReport {
        scanned: assigned.len(),
        invalid: run.outcomes.len(),
        cleaned: run.succeeded(),
        failed: run.failed(),
        message: format!(
            "Cleared {} of {} invalid assignment(s)",
            run.succeeded(),
            run.outcomes.len()
        ),
    };
    info!(
        cleaned = report.cleaned,
        failed = report.failed,
        "assignment cleanup complete"
    );
    Ok(report)
}

/// Applies `patch` with a deadline. An elapsed deadline is a
/// [`ReconcileError::Timeout`].
pub(crate) async fn update_with_timeout(
    repository: &dyn FineRepository,
    fine_id: &str,
    patch: FinePatch,
    timeout: Duration,
) -> ReconcileResult<TrafficFine> {
    match tokio::time::timeout(timeout, repository.update_fine(fine_id, patch)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ReconcileError::Timeout {
            operation: format!("update fine {}", fine_id),
            timeout,
        }),
    }
}
