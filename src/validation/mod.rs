//! Plate validation against the violation authority.
//!
//! [`SingleItemValidator`] checks one plate. [`BatchValidationOrchestrator`]
//! runs many of them under bounded concurrency and summarizes failures with
//! the classifier.

mod classifier;
mod orchestrator;
mod single;

pub use classifier::{
    GroupedErrors, MAX_SUMMARY_MESSAGE_CHARS, classify_message, generate_error_summary,
    group_validation_errors, map_to_validation_error, summarize_errors,
};
pub use orchestrator::{
    BatchOptions, BatchOutcome, BatchSummary, BatchValidationOrchestrator, BatchValidationOutcome,
};
pub use single::SingleItemValidator;
