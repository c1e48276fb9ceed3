//! The violation authority interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authority's answer for one license plate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityResponse {
    /// The plate that was checked.
    pub license_plate: String,
    /// Whether an outstanding fine is listed.
    pub has_fine: bool,
    /// Identifier of the answering authority.
    pub validation_source: String,
    /// Free-text details.
    #[serde(default)]
    pub details: String,
}

/// Typed failures from the violation authority.
///
/// Adapters report what they know structurally (status codes, transport
/// error kinds). [`AuthorityError::Other`] is reserved for failures that
/// arrive as bare text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    /// The request did not complete in time.
    #[error("authority request timed out")]
    Timeout,

    /// The authority throttled the caller.
    #[error("authority rate limit exceeded (HTTP 429)")]
    RateLimited,

    /// The authority could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The authority answered with a non-success status.
    #[error("authority returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// An opaque upstream failure.
    #[error("{0}")]
    Other(String),
}

impl AuthorityError {
    /// Maps a non-success HTTP status to a typed error.
    ///
    /// # Example
    ///
    /// ```
    /// use fine_reconciler::authority::AuthorityError;
    ///
    /// assert_eq!(AuthorityError::from_status(429, String::new()), AuthorityError::RateLimited);
    /// assert_eq!(AuthorityError::from_status(504, String::new()), AuthorityError::Timeout);
    /// ```
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => AuthorityError::RateLimited,
            408 | 504 => AuthorityError::Timeout,
            _ => AuthorityError::Http { status, body },
        }
    }
}

/// An external service that reports outstanding fines per license plate.
#[async_trait]
pub trait ViolationAuthority: Send + Sync {
    /// Identifier recorded as the validation source.
    fn source_id(&self) -> &str;

    /// Checks one plate.
    async fn validate(&self, license_plate: &str) -> Result<AuthorityResponse, AuthorityError>;
}
