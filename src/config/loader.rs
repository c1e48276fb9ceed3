//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ReconcileError, ReconcileResult};

use super::types::ReconcilerConfig;

/// Loads and provides access to the engine configuration.
///
/// # File Structure
///
/// ```text
/// validation:
///   batch_size: 5
///   concurrency: 2
///   continue_on_error: true
///   window_delay_ms: 300
///   batch_delay_ms: 1000
///   call_timeout_ms: 10000
/// cleanup:
///   batch_size: 10
///   concurrency: 3
/// authority:
///   base_url: "https://authority.example"
/// ```
///
/// # Example
///
/// ```no_run
/// use fine_reconciler::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/reconciler.yaml")?;
/// println!("Batch size: {}", loader.config().validation.batch_size);
/// # Ok::<(), fine_reconciler::error::ReconcileError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: ReconcilerConfig,
}

impl ConfigLoader {
    /// Loads configuration from the YAML file at `path`.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - The file is missing or unreadable
    /// - The file contains invalid YAML or mistyped fields
    pub fn load<P: AsRef<Path>>(path: P) -> ReconcileResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| ReconcileError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let config = Self::parse(&content).map_err(|message| ReconcileError::ConfigParseError {
            path: path_str.clone(),
            message,
        })?;

        info!(path = %path_str, "loaded reconciler configuration");
        Ok(Self { config })
    }

    fn parse(content: &str) -> Result<ReconcilerConfig, String> {
        // An empty document deserializes to unit, not to an empty map.
        if content.trim().is_empty() {
            return Ok(ReconcilerConfig::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> ReconcilerConfig {
        self.config
    }
}
