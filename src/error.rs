//! Error types for the fine reconciliation engine.
//!
//! This module provides the crate-wide error enum built on `thiserror`.
//! Collaborator failures keep their own typed errors ([`StoreError`],
//! [`AuthorityError`]) and are wrapped here when they cross a module boundary.

use std::time::Duration;

use thiserror::Error;

use crate::authority::AuthorityError;
use crate::models::ValidationError;
use crate::store::StoreError;

/// The main error type for the reconciliation engine.
///
/// # Example
///
/// ```
/// use fine_reconciler::error::ReconcileError;
///
/// let error = ReconcileError::PendingUpdateNotFound {
///     fine_id: "fine_001".to_string(),
/// };
/// assert_eq!(error.to_string(), "No pending status update for fine 'fine_001'");
/// ```
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A license plate was empty or whitespace only.
    #[error("License plate must not be blank")]
    BlankLicensePlate,

    /// The referenced fine does not exist.
    #[error("Traffic fine not found: {fine_id}")]
    FineNotFound {
        /// The fine identifier that was looked up.
        fine_id: String,
    },

    /// No pending confirmation is queued for the fine.
    #[error("No pending status update for fine '{fine_id}'")]
    PendingUpdateNotFound {
        /// The fine identifier that was looked up.
        fine_id: String,
    },

    /// A bulk action outside the supported set was requested.
    #[error("Unsupported bulk action '{action}': {reason}")]
    UnsupportedBulkAction {
        /// The requested action name.
        action: String,
        /// Why the action cannot be applied.
        reason: String,
    },

    /// The persistent store reported a failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The external violation authority reported a failure.
    #[error("Authority error: {0}")]
    Authority(#[from] AuthorityError),

    /// A failure that has already been classified.
    #[error("{0}")]
    Validation(ValidationError),

    /// A collaborator call did not finish within its deadline.
    #[error("Operation '{operation}' timed out after {}ms", .timeout.as_millis())]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// A batch stopped at its first failure because `continue_on_error` was off.
    #[error("Batch aborted after {processed} item(s): {error}")]
    BatchAborted {
        /// Items processed before the abort, including the failing one.
        processed: usize,
        /// The classified failure that stopped the batch.
        error: ValidationError,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The configuration has no `authority` section to build a client from.
    #[error("No violation authority configured")]
    AuthorityNotConfigured,
}

/// A type alias for Results that return ReconcileError.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
