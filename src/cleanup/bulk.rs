//! Bulk actions over an arbitrary list of fines.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch::{BatchPlan, NoDelay, ProgressTracker, run_batched};
use crate::error::{ReconcileError, ReconcileResult};
use crate::store::{FinePatch, FineRepository};

use super::assignments::{CleanupOptions, update_with_timeout};

/// The closed set of bulk actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Unassign each fine from its lease.
    Clear,
    /// Mark each fine paid as of now.
    MarkPaid,
    /// Reassign each fine. Not supported; always rejected.
    Reassign,
}

impl BulkAction {
    /// Returns the wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Clear => "clear",
            BulkAction::MarkPaid => "mark_paid",
            BulkAction::Reassign => "reassign",
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkAction {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "clear" => Ok(BulkAction::Clear),
            "mark_paid" | "markPaid" => Ok(BulkAction::MarkPaid),
            "reassign" => Ok(BulkAction::Reassign),
            other => Err(ReconcileError::UnsupportedBulkAction {
                action: other.to_string(),
                reason: "expected one of clear, mark_paid, reassign".to_string(),
            }),
        }
    }
}

/// One fine the bulk action could not be applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    /// The fine that failed.
    pub fine_id: String,
    /// What went wrong.
    pub error: String,
}

/// Totals for a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    /// The action applied.
    pub action: BulkAction,
    /// Fines attempted.
    pub processed: usize,
    /// Fines updated.
    pub succeeded: usize,
    /// Fines that failed.
    pub failed: usize,
    /// Details of each failure.
    pub failures: Vec<BulkFailure>,
}

/// Applies `action` to every fine in `fine_ids`.
///
/// `Reassign` is rejected with [`ReconcileError::UnsupportedBulkAction`]
/// before any write. Otherwise writes run in bounded batches and per-fine
/// failures, including unknown ids, are counted rather than returned.
pub async fn bulk_process_fines(
    repository: &dyn FineRepository,
    progress: &ProgressTracker,
    fine_ids: &[String],
    action: BulkAction,
    options: CleanupOptions,
) -> ReconcileResult<BulkReport> {
    let patch = match action {
        BulkAction::Clear => FinePatch::clear_assignment(),
        BulkAction::MarkPaid => FinePatch::mark_paid(Utc::now()),
        BulkAction::Reassign => {
            return Err(ReconcileError::UnsupportedBulkAction {
                action: action.to_string(),
                reason: "reassignment must be done per fine through lease matching".to_string(),
            });
        }
    };

    info!(action = %action, fines = fine_ids.len(), "starting bulk action");

    let plan = BatchPlan::new(options.batch_size, options.concurrency);
    let timeout = options.write_timeout;
    let patch = &patch;
    let apply = move |fine_id: String| async move {
        update_with_timeout(repository, &fine_id, patch.clone(), timeout).await
    };
    let run = run_batched(fine_ids.to_vec(), plan, &NoDelay, progress, apply).await;

    let failures: Vec<BulkFailure> = run
        .outcomes
        .iter()
        .filter_map(|(fine_id, result)| {
            let error = result.as_ref().err()?;
            warn!(
                fine_id = %fine_id,
                action = %action,
                error = %error,
                "bulk action failed for fine"
            );
            Some(BulkFailure {
                fine_id: fine_id.clone(),
                error: error.to_string(),
            })
        })
        .collect();

    let report = BulkReport {
        action,
        processed: run.outcomes.len(),
        succeeded: run.succeeded(),
        failed: failures.len(),
        failures,
    };
    info!(
        action = %action,
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "bulk action complete"
    );
    Ok(report)
}
