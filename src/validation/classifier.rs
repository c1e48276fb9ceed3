//! Failure classification and grouped summaries.
//!
//! Typed failures map straight to an [`ErrorCode`]. Only failures that
//! arrive as bare text go through the message heuristics in
//! [`classify_message`].

use std::collections::BTreeMap;

use serde_json::json;

use crate::authority::AuthorityError;
use crate::error::ReconcileError;
use crate::models::{ErrorCode, ValidationError};

/// Longest message excerpt rendered in a summary clause.
pub const MAX_SUMMARY_MESSAGE_CHARS: usize = 100;

/// Errors grouped by code, in code order.
pub type GroupedErrors = BTreeMap<ErrorCode, Vec<ValidationError>>;

/// Classifies any engine failure for `license_plate`.
///
/// Already-classified errors pass through unchanged, so mapping twice is
/// harmless.
///
/// # Example
///
/// ```
/// use fine_reconciler::authority::AuthorityError;
/// use fine_reconciler::error::ReconcileError;
/// use fine_reconciler::models::ErrorCode;
/// use fine_reconciler::validation::map_to_validation_error;
///
/// let error = ReconcileError::Authority(AuthorityError::RateLimited);
/// let classified = map_to_validation_error(&error, "ABC123");
/// assert_eq!(classified.code, ErrorCode::RateLimit);
/// assert_eq!(classified.license_plate, "ABC123");
/// ```
pub fn map_to_validation_error(error: &ReconcileError, license_plate: &str) -> ValidationError {
    match error {
        ReconcileError::Validation(inner) => inner.clone(),
        ReconcileError::BatchAborted { error, .. } => error.clone(),
        ReconcileError::Authority(authority) => classify_authority_error(authority, license_plate),
        ReconcileError::Timeout { operation, timeout } => {
            ValidationError::new(ErrorCode::Timeout, error.to_string(), license_plate).with_details(
                json!({ "operation": operation, "timeout_ms": timeout.as_millis() as u64 }),
            )
        }
        other => {
            let message = other.to_string();
            ValidationError::new(classify_message(&message), message, license_plate)
        }
    }
}

fn classify_authority_error(error: &AuthorityError, license_plate: &str) -> ValidationError {
    let message = error.to_string();
    match error {
        AuthorityError::Timeout => ValidationError::new(ErrorCode::Timeout, message, license_plate),
        AuthorityError::RateLimited => {
            ValidationError::new(ErrorCode::RateLimit, message, license_plate)
        }
        AuthorityError::Network(_) => {
            ValidationError::new(ErrorCode::Network, message, license_plate)
        }
        AuthorityError::Http { status, .. } => {
            ValidationError::new(ErrorCode::Validation, message, license_plate)
                .with_details(json!({ "status": status }))
        }
        AuthorityError::Other(text) => {
            ValidationError::new(classify_message(text), message, license_plate)
        }
    }
}

/// Best-effort classification of an opaque failure message.
///
/// # Example
///
/// ```
/// use fine_reconciler::models::ErrorCode;
/// use fine_reconciler::validation::classify_message;
///
/// assert_eq!(classify_message("Request timed out"), ErrorCode::Timeout);
/// assert_eq!(classify_message("HTTP 429 Too Many Requests"), ErrorCode::RateLimit);
/// assert_eq!(classify_message("something odd"), ErrorCode::Validation);
/// ```
pub fn classify_message(message: &str) -> ErrorCode {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCode::Timeout
    } else if lower.contains("rate limit")
        || lower.contains("429")
        || lower.contains("too many requests")
    {
        ErrorCode::RateLimit
    } else if lower.contains("network")
        || lower.contains("connection")
        || lower.contains("fetch")
        || lower.contains("dns")
    {
        ErrorCode::Network
    } else {
        ErrorCode::Validation
    }
}

/// Groups errors by code.
pub fn group_validation_errors(errors: &[ValidationError]) -> GroupedErrors {
    let mut grouped = GroupedErrors::new();
    for error in errors {
        grouped.entry(error.code).or_default().push(error.clone());
    }
    grouped
}

/// Renders one clause per code: `"<n> instance(s) of <CODE>: <first message>"`.
///
/// Clauses are joined with `". "`. The first message of each group is cut at
/// [`MAX_SUMMARY_MESSAGE_CHARS`] characters with a trailing ellipsis.
pub fn generate_error_summary(grouped: &GroupedErrors) -> String {
    grouped
        .iter()
        .filter_map(|(code, errors)| {
            let first = errors.first()?;
            Some(format!(
                "{} instance(s) of {}: {}",
                errors.len(),
                code,
                truncate_message(&first.message)
            ))
        })
        .collect::<Vec<_>>()
        .join(". ")
}

/// Groups and summarizes in one step.
pub fn summarize_errors(errors: &[ValidationError]) -> String {
    generate_error_summary(&group_validation_errors(errors))
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_SUMMARY_MESSAGE_CHARS {
        return message.to_string();
    }
    let cut: String = message.chars().take(MAX_SUMMARY_MESSAGE_CHARS).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use proptest::prelude::*;
    use std::time::Duration;

    fn error(code: ErrorCode, message: &str) -> ValidationError {
        ValidationError::new(code, message, "ABC123")
    }

    #[test]
    fn test_classified_error_passes_through() {
        let original = error(ErrorCode::Network, "upstream down")
            .with_details(json!({ "attempt": 1 }));
        let wrapped = ReconcileError::Validation(original.clone());
        assert_eq!(map_to_validation_error(&wrapped, "OTHER"), original);
    }

    #[test]
    fn test_typed_authority_errors_map_directly() {
        let cases = [
            (AuthorityError::Timeout, ErrorCode::Timeout),
            (AuthorityError::RateLimited, ErrorCode::RateLimit),
            (AuthorityError::Network("refused".to_string()), ErrorCode::Network),
            (
                AuthorityError::Http {
                    status: 500,
                    body: "boom".to_string(),
                },
                ErrorCode::Validation,
            ),
        ];
        for (authority, expected) in cases {
            let classified =
                map_to_validation_error(&ReconcileError::Authority(authority), "ABC123");
            assert_eq!(classified.code, expected);
        }
    }

    #[test]
    fn test_http_error_keeps_status_in_details() {
        let classified = map_to_validation_error(
            &ReconcileError::Authority(AuthorityError::Http {
                status: 503,
                body: String::new(),
            }),
            "ABC123",
        );
        assert_eq!(classified.details, Some(json!({ "status": 503 })));
    }

    #[test]
    fn test_opaque_authority_error_uses_heuristics() {
        let classified = map_to_validation_error(
            &ReconcileError::Authority(AuthorityError::Other(
                "Failed to fetch: connection reset".to_string(),
            )),
            "ABC123",
        );
        assert_eq!(classified.code, ErrorCode::Network);
    }

    #[test]
    fn test_call_timeout_maps_to_timeout_code() {
        let classified = map_to_validation_error(
            &ReconcileError::Timeout {
                operation: "validate ABC123".to_string(),
                timeout: Duration::from_millis(50),
            },
            "ABC123",
        );
        assert_eq!(classified.code, ErrorCode::Timeout);
        assert_eq!(
            classified.details,
            Some(json!({ "operation": "validate ABC123", "timeout_ms": 50 }))
        );
    }

    #[test]
    fn test_unclassified_errors_default_to_validation() {
        let classified = map_to_validation_error(&ReconcileError::BlankLicensePlate, "");
        assert_eq!(classified.code, ErrorCode::Validation);
        assert_eq!(classified.message, "License plate must not be blank");

        let classified = map_to_validation_error(
            &ReconcileError::Store(StoreError::Backend {
                message: "network unreachable".to_string(),
            }),
            "ABC123",
        );
        assert_eq!(classified.code, ErrorCode::Network);
    }

    #[test]
    fn test_summary_two_rate_limits_and_one_network() {
        let errors = vec![
            error(ErrorCode::RateLimit, "rate limit exceeded"),
            error(ErrorCode::Network, "connection refused"),
            error(ErrorCode::RateLimit, "rate limit exceeded again"),
        ];
        let grouped = group_validation_errors(&errors);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&ErrorCode::RateLimit].len(), 2);

        let summary = generate_error_summary(&grouped);
        assert_eq!(
            summary,
            "2 instance(s) of RATE_LIMIT_ERROR: rate limit exceeded. \
             1 instance(s) of NETWORK_ERROR: connection refused"
        );
    }

    #[test]
    fn test_long_message_is_truncated() {
        let long = "x".repeat(150);
        let summary = summarize_errors(&[error(ErrorCode::Validation, &long)]);
        let expected = format!("1 instance(s) of VALIDATION_ERROR: {}...", "x".repeat(100));
        assert_eq!(summary, expected);
    }

    #[test]
    fn test_message_of_exactly_limit_is_not_truncated() {
        let exact = "y".repeat(MAX_SUMMARY_MESSAGE_CHARS);
        let summary = summarize_errors(&[error(ErrorCode::Timeout, &exact)]);
        assert!(!summary.ends_with("..."));
    }

    #[test]
    fn test_empty_errors_give_empty_summary() {
        assert_eq!(summarize_errors(&[]), "");
    }

    proptest! {
        #[test]
        fn prop_summary_has_one_clause_per_code(
            codes in proptest::collection::vec(0usize..4, 1..30)
        ) {
            let all = [
                ErrorCode::Validation,
                ErrorCode::Timeout,
                ErrorCode::RateLimit,
                ErrorCode::Network,
            ];
            let errors: Vec<ValidationError> = codes
                .iter()
                .map(|i| error(all[*i], "failure"))
                .collect();

            let grouped = group_validation_errors(&errors);
            let total: usize = grouped.values().map(Vec::len).sum();
            prop_assert_eq!(total, errors.len());

            let summary = generate_error_summary(&grouped);
            prop_assert_eq!(summary.split(". ").count(), grouped.len());
        }
    }
}
