//! Response types for the reconciliation API.
//!
//! This module defines the error body and the mapping from engine errors to
//! HTTP status codes.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::store::StoreError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        let error = match rejection {
            JsonRejection::JsonDataError(err) => {
                let body_text = err.body_text();
                if body_text.contains("missing field") {
                    ApiError::new("VALIDATION_ERROR", body_text)
                } else {
                    ApiError::malformed_json(body_text)
                }
            }
            JsonRejection::JsonSyntaxError(err) => {
                ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
            }
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
            }
            _ => ApiError::malformed_json("Failed to parse request body"),
        };
        Self::new(StatusCode::BAD_REQUEST, error)
    }
}

impl From<ReconcileError> for ApiErrorResponse {
    fn from(error: ReconcileError) -> Self {
        let message = error.to_string();
        match error {
            ReconcileError::BlankLicensePlate => {
                Self::new(StatusCode::BAD_REQUEST, ApiError::new("INVALID_LICENSE_PLATE", message))
            }
            ReconcileError::UnsupportedBulkAction { reason, .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details("UNSUPPORTED_BULK_ACTION", message, reason),
            ),
            ReconcileError::FineNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("FINE_NOT_FOUND", message))
            }
            ReconcileError::PendingUpdateNotFound { .. } => Self::new(
                StatusCode::NOT_FOUND,
                ApiError::new("PENDING_UPDATE_NOT_FOUND", message),
            ),
            ReconcileError::Store(StoreError::NotFound { .. }) => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", message))
            }
            ReconcileError::Store(StoreError::Backend { .. }) => {
                Self::new(StatusCode::BAD_GATEWAY, ApiError::new("STORE_ERROR", message))
            }
            ReconcileError::Authority(_) => {
                Self::new(StatusCode::BAD_GATEWAY, ApiError::new("AUTHORITY_ERROR", message))
            }
            ReconcileError::Validation(classified) => Self::new(
                StatusCode::BAD_GATEWAY,
                ApiError::with_details(
                    classified.code.as_str(),
                    classified.message,
                    format!("License plate: {}", classified.license_plate),
                ),
            ),
            ReconcileError::BatchAborted { processed, error } => Self::new(
                StatusCode::BAD_GATEWAY,
                ApiError::with_details(
                    "BATCH_ABORTED",
                    format!("Batch aborted after {} item(s)", processed),
                    format!("{} for {}: {}", error.code, error.license_plate, error.message),
                ),
            ),
            ReconcileError::Timeout { .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, ApiError::new("TIMEOUT_ERROR", message))
            }
            ReconcileError::ConfigNotFound { .. }
            | ReconcileError::ConfigParseError { .. }
            | ReconcileError::AuthorityNotConfigured => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorCode, ValidationError};

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ReconcileError::BlankLicensePlate, StatusCode::BAD_REQUEST),
            (
                ReconcileError::UnsupportedBulkAction {
                    action: "reassign".to_string(),
                    reason: "no".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                ReconcileError::FineNotFound {
                    fine_id: "f1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ReconcileError::PendingUpdateNotFound {
                    fine_id: "f1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ReconcileError::Store(StoreError::Backend {
                    message: "down".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ReconcileError::ConfigNotFound {
                    path: "x.yaml".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ReconcileError::AuthorityNotConfigured,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let response: ApiErrorResponse = error.into();
            assert_eq!(response.status, expected);
        }
    }

    #[test]
    fn test_classified_error_keeps_code() {
        let error = ReconcileError::Validation(ValidationError::new(
            ErrorCode::RateLimit,
            "slow down",
            "ABC123",
        ));
        let response: ApiErrorResponse = error.into();
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.error.code, "RATE_LIMIT_ERROR");
        assert_eq!(response.error.message, "slow down");
    }
}
