//! Request types for the reconciliation API.

use serde::{Deserialize, Serialize};

use crate::validation::BatchOptions;

/// Request body for `POST /validations/batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValidationRequest {
    /// Plates to validate.
    pub license_plates: Vec<String>,
    /// Overrides for the configured batch options.
    #[serde(default)]
    pub options: Option<BatchOptions>,
}

/// Request body for `POST /fines/bulk`.
///
/// `action` is kept as text so an unknown action is reported as an
/// unsupported bulk action rather than a JSON error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkRequest {
    /// Fines to act on.
    pub fine_ids: Vec<String>,
    /// One of `clear`, `mark_paid` or `reassign`.
    pub action: String,
}
