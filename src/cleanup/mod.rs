//! Repair and bulk jobs over stored fines.

mod assignments;
mod bulk;

pub use assignments::{
    CleanupOptions, CleanupReport, InvalidAssignment, cleanup_invalid_assignments,
    cleanup_invalid_assignments_at, find_invalid_assignments,
};
pub use bulk::{BulkAction, BulkFailure, BulkReport, bulk_process_fines};
