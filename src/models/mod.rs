//! Core data models for the fine reconciliation engine.
//!
//! This module contains all the domain models used throughout the engine.

mod fine;
mod lease;
mod progress;
mod validation;

pub use fine::{AssignedFine, AssignmentStatus, PaymentStatus, TrafficFine};
pub use lease::{Lease, Vehicle};
pub use progress::BatchProgress;
pub use validation::{
    ErrorCode, PendingStatusUpdate, ValidationError, ValidationLogEntry, ValidationResult,
};
