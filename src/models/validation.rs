//! Validation outcome models.
//!
//! This module contains the result of an external-authority check, its
//! persisted log form, the classified [`ValidationError`] used for batch
//! summaries, and the [`PendingStatusUpdate`] awaiting human confirmation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The outcome of checking one license plate against the violation authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The plate that was checked.
    pub license_plate: String,
    /// When the check completed.
    pub validated_at: DateTime<Utc>,
    /// Identifier of the authority that answered.
    pub validation_source: String,
    /// Whether the authority lists an outstanding fine for the plate.
    pub has_fine: bool,
    /// Free-text details returned by the authority.
    pub details: String,
}

/// A persisted [`ValidationResult`], kept for audit and history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationLogEntry {
    /// Generated identifier.
    pub id: String,
    /// When the entry was written.
    pub validation_date: DateTime<Utc>,
    /// The stored result.
    #[serde(flatten)]
    pub result: ValidationResult,
}

/// The closed set of classified failure codes.
///
/// Variants are ordered so that grouped summaries list codes in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Default when nothing more specific is known.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// The call did not finish in time.
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    /// The authority throttled the caller.
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    /// The authority could not be reached.
    #[serde(rename = "NETWORK_ERROR")]
    Network,
}

impl ErrorCode {
    /// Returns the wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Timeout => "TIMEOUT_ERROR",
            ErrorCode::RateLimit => "RATE_LIMIT_ERROR",
            ErrorCode::Network => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified per-plate failure.
///
/// Never persisted. Batches collect these to build a grouped summary.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ValidationError {
    /// The classified failure code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// The plate being validated when the failure happened.
    pub license_plate: String,
    /// When the failure was classified.
    pub timestamp: DateTime<Utc>,
    /// Opaque extra context from the underlying failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationError {
    /// Creates a classified error stamped with the current time.
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        license_plate: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            license_plate: license_plate.into(),
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Attaches opaque details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A status change inferred from a validation, waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingStatusUpdate {
    /// The fine that would be marked paid.
    pub fine_id: String,
    /// Plate on the fine.
    pub license_plate: String,
    /// The validation that triggered the inference.
    pub validation_result: ValidationResult,
    /// When the update was queued.
    pub timestamp: DateTime<Utc>,
}
