//! Validation of one license plate against the violation authority.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::authority::ViolationAuthority;
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::ValidationResult;
use crate::store::FineRepository;

use super::classifier::map_to_validation_error;

/// Checks single plates and records each answer in the validation log.
pub struct SingleItemValidator {
    authority: Arc<dyn ViolationAuthority>,
    repository: Arc<dyn FineRepository>,
    call_timeout: Duration,
}

impl SingleItemValidator {
    /// Creates a validator with a per-call deadline.
    pub fn new(
        authority: Arc<dyn ViolationAuthority>,
        repository: Arc<dyn FineRepository>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            authority,
            repository,
            call_timeout,
        }
    }

    /// The deadline applied to every authority and store call.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Validates one plate.
    ///
    /// Blank plates are rejected before any call. Authority failures and
    /// timeouts come back as [`ReconcileError::Validation`] carrying a
    /// classified error. Failing to read the previous log entry or to write
    /// the new one, including running past the deadline, is logged and
    /// otherwise ignored.
    pub async fn validate_traffic_fine(
        &self,
        license_plate: &str,
    ) -> ReconcileResult<ValidationResult> {
        let plate = license_plate.trim();
        if plate.is_empty() {
            return Err(ReconcileError::BlankLicensePlate);
        }

        self.log_attempt(plate).await;

        let lookup = tokio::time::timeout(self.call_timeout, self.authority.validate(plate));
        let response = match lookup.await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                let classified = map_to_validation_error(&ReconcileError::Authority(error), plate);
                warn!(
                    license_plate = %plate,
                    code = %classified.code,
                    error = %classified.message,
                    "validation failed"
                );
                return Err(ReconcileError::Validation(classified));
            }
            Err(_) => {
                let timeout = ReconcileError::Timeout {
                    operation: format!("validate {}", plate),
                    timeout: self.call_timeout,
                };
                warn!(
                    license_plate = %plate,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "validation timed out"
                );
                return Err(ReconcileError::Validation(map_to_validation_error(
                    &timeout, plate,
                )));
            }
        };

        let validation_source = if response.validation_source.trim().is_empty() {
            self.authority.source_id().to_string()
        } else {
            response.validation_source
        };
        let result = ValidationResult {
            license_plate: plate.to_string(),
            validated_at: Utc::now(),
            validation_source,
            has_fine: response.has_fine,
            details: response.details,
        };
        info!(
            license_plate = %plate,
            has_fine = result.has_fine,
            source = %result.validation_source,
            "plate validated"
        );

        self.record(&result).await;
        Ok(result)
    }

    async fn log_attempt(&self, plate: &str) {
        let lookup = self.repository.latest_validation(plate);
        match tokio::time::timeout(self.call_timeout, lookup).await {
            Ok(Ok(Some(previous))) => debug!(
                license_plate = %plate,
                previous_validation = %previous.validation_date,
                previous_has_fine = previous.result.has_fine,
                "revalidating plate"
            ),
            Ok(Ok(None)) => debug!(license_plate = %plate, "first validation for plate"),
            Ok(Err(error)) => warn!(
                license_plate = %plate,
                error = %error,
                "could not look up previous validation"
            ),
            Err(_) => warn!(
                license_plate = %plate,
                timeout_ms = self.call_timeout.as_millis() as u64,
                "previous validation lookup timed out"
            ),
        }
    }

    async fn record(&self, result: &ValidationResult) {
        let write = self.repository.insert_validation(result);
        match tokio::time::timeout(self.call_timeout, write).await {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => warn!(
                license_plate = %result.license_plate,
                error = %error,
                "failed to record validation log entry"
            ),
            Err(_) => warn!(
                license_plate = %result.license_plate,
                timeout_ms = self.call_timeout.as_millis() as u64,
                "validation log write timed out"
            ),
        }
    }
}
