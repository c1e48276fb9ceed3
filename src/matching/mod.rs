//! Lease matching for traffic fines.
//!
//! A fine belongs to the lease whose active interval covers its violation
//! date. The same interval check backs assignment and cleanup.

mod assignment;
mod interval;
mod lease_selection;

pub use assignment::{
    AssignmentOutcome, AutoAssignReport, assign_fine, assign_fine_at, auto_assign_unassigned,
    auto_assign_unassigned_at,
};
pub use interval::{DATE_TOLERANCE_DAYS, DateCheck, validate_fine_date, validate_fine_date_at};
pub use lease_selection::{LeaseMatch, find_best_matching_lease, find_best_matching_lease_at};
