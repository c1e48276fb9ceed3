//! Configuration loading and management for the reconciliation engine.
//!
//! This module loads batch sizes, concurrency limits, pacing delays and
//! call deadlines from a YAML file.
//!
//! # Example
//!
//! ```no_run
//! use fine_reconciler::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/reconciler.yaml").unwrap();
//! println!("Concurrency: {}", config.config().validation.concurrency);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{AuthorityConfig, CleanupConfig, ReconcilerConfig, ValidationConfig};
