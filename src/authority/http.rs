//! HTTP client for the violation authority.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::AuthorityConfig;

use super::client::{AuthorityError, AuthorityResponse, ViolationAuthority};

/// Source identifier recorded on results from this client.
pub const HTTP_AUTHORITY_SOURCE: &str = "traffic-authority-http";

#[derive(Debug, Deserialize)]
struct ViolationLookup {
    has_fine: bool,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

/// Queries `GET {base_url}/violations?plate=...`.
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthority {
    /// Creates a client from configuration.
    pub fn new(config: &AuthorityConfig) -> Result<Self, AuthorityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AuthorityError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn transport_error(error: reqwest::Error) -> AuthorityError {
    if error.is_timeout() {
        AuthorityError::Timeout
    } else if error.is_connect() || error.is_request() {
        AuthorityError::Network(error.to_string())
    } else {
        AuthorityError::Other(error.to_string())
    }
}

#[async_trait]
impl ViolationAuthority for HttpAuthority {
    fn source_id(&self) -> &str {
        HTTP_AUTHORITY_SOURCE
    }

    async fn validate(&self, license_plate: &str) -> Result<AuthorityResponse, AuthorityError> {
        let url = format!("{}/violations", self.base_url);
        debug!(url = %url, license_plate = %license_plate, "querying violation authority");

        let resp = self
            .client
            .get(&url)
            .query(&[("plate", license_plate)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthorityError::from_status(status.as_u16(), body));
        }

        let lookup: ViolationLookup = resp.json().await.map_err(|e| {
            AuthorityError::Other(format!("malformed authority response: {}", e))
        })?;
        info!(license_plate = %license_plate, has_fine = lookup.has_fine, "authority answered");

        Ok(AuthorityResponse {
            license_plate: license_plate.to_string(),
            has_fine: lookup.has_fine,
            validation_source: lookup
                .source
                .unwrap_or_else(|| HTTP_AUTHORITY_SOURCE.to_string()),
            details: lookup.details.unwrap_or_default(),
        })
    }
}
