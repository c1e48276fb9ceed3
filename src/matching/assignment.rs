//! Assignment of fines to the lease that was active on the violation date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReconcileError, ReconcileResult};
use crate::store::{FinePatch, FineRepository};

use super::lease_selection::find_best_matching_lease_at;

/// What happened to one fine during assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    /// The fine considered.
    pub fine_id: String,
    /// The lease it is now assigned to, if a match was found.
    pub lease_id: Option<String>,
    /// Why the fine was or was not assigned.
    pub reason: String,
}

impl AssignmentOutcome {
    /// True when the fine was linked to a lease.
    pub fn assigned(&self) -> bool {
        self.lease_id.is_some()
    }
}

/// Totals for an auto-assignment sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoAssignReport {
    /// Unassigned fines examined.
    pub scanned: usize,
    /// Fines linked to a lease.
    pub assigned: usize,
    /// Fines with no covering lease. They stay unassigned.
    pub unmatched: usize,
    /// Fines that could not be processed because of a store failure.
    pub failed: usize,
    /// Per-fine outcomes for the fines that were processed.
    pub outcomes: Vec<AssignmentOutcome>,
}

/// Assigns one fine to its best matching lease.
///
/// An existing assignment is replaced when a covering lease is found and
/// left untouched otherwise.
pub async fn assign_fine(
    repository: &dyn FineRepository,
    fine_id: &str,
) -> ReconcileResult<AssignmentOutcome> {
    assign_fine_at(repository, fine_id, Utc::now()).await
}

/// Same as [`assign_fine`], with an explicit "now" for open leases.
pub async fn assign_fine_at(
    repository: &dyn FineRepository,
    fine_id: &str,
    now: DateTime<Utc>,
) -> ReconcileResult<AssignmentOutcome> {
    let fine = repository
        .get_fine(fine_id)
        .await?
        .ok_or_else(|| ReconcileError::FineNotFound {
            fine_id: fine_id.to_string(),
        })?;

    let matched =
        find_best_matching_lease_at(repository, &fine.license_plate, fine.violation_date, now)
            .await?;
    let Some(lease_id) = matched.lease_id else {
        info!(fine_id = %fine.id, reason = %matched.reason, "fine left unassigned");
        return Ok(AssignmentOutcome {
            fine_id: fine.id,
            lease_id: None,
            reason: matched.reason,
        });
    };

    repository.update_fine(&fine.id, FinePatch::assign(lease_id.clone())).await?;
    info!(fine_id = %fine.id, lease_id = %lease_id, "fine assigned");

    Ok(AssignmentOutcome {
        fine_id: fine.id,
        lease_id: Some(lease_id),
        reason: matched.reason,
    })
}

/// Tries to assign every unassigned fine.
///
/// Fines are handled one at a time. A store failure on one fine is logged
/// and counted, and the sweep moves on.
pub async fn auto_assign_unassigned(
    repository: &dyn FineRepository,
) -> ReconcileResult<AutoAssignReport> {
    auto_assign_unassigned_at(repository, Utc::now()).await
}

/// Same as [`auto_assign_unassigned`], with an explicit "now" for open leases.
pub async fn auto_assign_unassigned_at(
    repository: &dyn FineRepository,
    now: DateTime<Utc>,
) -> ReconcileResult<AutoAssignReport> {
    let fines = repository.unassigned_fines().await?;
    let mut report = AutoAssignReport {
        scanned: fines.len(),
        ..AutoAssignReport::default()
    };

    for fine in fines {
        match assign_fine_at(repository, &fine.id, now).await {
            Ok(outcome) => {
                if outcome.assigned() {
                    report.assigned += 1;
                } else {
                    report.unmatched += 1;
                }
                report.outcomes.push(outcome);
            }
            Err(error) => {
                warn!(fine_id = %fine.id, error = %error, "auto-assignment failed");
                report.failed += 1;
            }
        }
    }

    info!(
        scanned = report.scanned,
        assigned = report.assigned,
        unmatched = report.unmatched,
        failed = report.failed,
        "auto-assignment sweep complete"
    );
    Ok(report)
}
