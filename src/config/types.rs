//! Configuration types for the reconciliation engine.
//!
//! These structures are deserialized from YAML. Every field has a default,
//! so a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_validation_batch_size() -> usize {
    5
}

fn default_validation_concurrency() -> usize {
    2
}

fn default_continue_on_error() -> bool {
    true
}

fn default_window_delay_ms() -> u64 {
    300
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_cleanup_batch_size() -> usize {
    10
}

fn default_cleanup_concurrency() -> usize {
    3
}

/// Settings for batch validation against the violation authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Plates per sequential batch.
    #[serde(default = "default_validation_batch_size")]
    pub batch_size: usize,
    /// Maximum authority calls in flight at once.
    #[serde(default = "default_validation_concurrency")]
    pub concurrency: usize,
    /// Keep going after a failed plate.
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,
    /// Pause between concurrency windows inside a batch.
    #[serde(default = "default_window_delay_ms")]
    pub window_delay_ms: u64,
    /// Pause between batches.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// Deadline for a single authority call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_validation_batch_size(),
            concurrency: default_validation_concurrency(),
            continue_on_error: default_continue_on_error(),
            window_delay_ms: default_window_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl ValidationConfig {
    /// The per-call deadline as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Settings for the assignment cleanup and bulk jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Fines per sequential batch.
    #[serde(default = "default_cleanup_batch_size")]
    pub batch_size: usize,
    /// Maximum writes in flight at once.
    #[serde(default = "default_cleanup_concurrency")]
    pub concurrency: usize,
    /// Deadline for a single store write.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            batch_size: default_cleanup_batch_size(),
            concurrency: default_cleanup_concurrency(),
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl CleanupConfig {
    /// The per-write deadline as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Connection settings for the HTTP violation authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Client-side request timeout.
    #[serde(default = "default_call_timeout_ms")]
    pub timeout_ms: u64,
}

/// The complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Batch validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Cleanup and bulk job settings.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// HTTP authority settings. Absent when another authority is injected.
    #[serde(default)]
    pub authority: Option<AuthorityConfig>,
}
