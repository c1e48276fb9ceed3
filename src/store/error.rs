//! Store error type.

use thiserror::Error;

/// Errors reported by a [`FineRepository`](super::FineRepository).
///
/// "No row matched" is reported as [`StoreError::NotFound`], separately
/// from backend failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No row matched the filter.
    #[error("no {table} row with id '{id}'")]
    NotFound {
        /// The table that was searched.
        table: &'static str,
        /// The identifier that did not match.
        id: String,
    },

    /// The backend rejected or failed the operation.
    #[error("{message}")]
    Backend {
        /// Backend-provided description.
        message: String,
    },
}

/// A type alias for Results that return StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
