//! Selection of the lease active for a plate at a violation date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReconcileResult;
use crate::store::FineRepository;

use super::interval::validate_fine_date_at;

/// The lease chosen for a violation, or why none was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseMatch {
    /// The matching lease, if any.
    pub lease_id: Option<String>,
    /// Human-readable explanation of the decision.
    pub reason: String,
}

impl LeaseMatch {
    fn none(reason: impl Into<String>) -> Self {
        Self {
            lease_id: None,
            reason: reason.into(),
        }
    }
}

/// Finds the lease that was active for `license_plate` on `violation_date`.
///
/// Candidate leases come from every vehicle carrying the plate, ordered by
/// start date descending. The first lease whose widened interval covers the
/// violation wins, so overlapping leases resolve to the most recent one.
///
/// Store failures are returned as errors. "No match" is not an error; it is
/// reported through [`LeaseMatch::reason`].
pub async fn find_best_matching_lease(
    repository: &dyn FineRepository,
    license_plate: &str,
    violation_date: DateTime<Utc>,
) -> ReconcileResult<LeaseMatch> {
    find_best_matching_lease_at(repository, license_plate, violation_date, Utc::now()).await
}

/// Same as [`find_best_matching_lease`], with an explicit "now" for open leases.
pub async fn find_best_matching_lease_at(
    repository: &dyn FineRepository,
    license_plate: &str,
    violation_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ReconcileResult<LeaseMatch> {
    let plate = license_plate.trim();

    let vehicles = repository.vehicles_by_plate(plate).await?;
    if vehicles.is_empty() {
        return Ok(LeaseMatch::none(format!(
            "no matching vehicle for license plate {}",
            plate
        )));
    }

    let vehicle_ids: Vec<String> = vehicles.into_iter().map(|v| v.id).collect();
    let leases = repository.leases_for_vehicles(&vehicle_ids).await?;
    if leases.is_empty() {
        return Ok(LeaseMatch::none(format!(
            "no matching lease for vehicles with license plate {}",
            plate
        )));
    }

    let candidates = leases.len();
    let best = leases.into_iter().find(|lease| {
        validate_fine_date_at(violation_date, lease.start_date, lease.end_date, now).is_valid
    });

    match best {
        Some(lease) => {
            debug!(
                license_plate = %plate,
                lease_id = %lease.id,
                candidates,
                "matched violation to lease"
            );
            Ok(LeaseMatch {
                reason: format!(
                    "lease {} covers violation date {}",
                    lease.id,
                    violation_date.date_naive()
                ),
                lease_id: Some(lease.id),
            })
        }
        None => Ok(LeaseMatch::none(format!(
            "no lease covers the violation date {} ({} candidate(s) checked)",
            violation_date.date_naive(),
            candidates
        ))),
    }
}
