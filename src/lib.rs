//! Traffic-fine reconciliation engine
//!
//! This crate matches traffic fines to the lease that was active on the
//! violation date, validates license plates against an external violation
//! authority in rate-limited batches, gates inferred payment-status changes
//! behind human confirmation, and repairs stored assignments that no longer
//! hold.

#![warn(missing_docs)]

pub mod api;
pub mod authority;
pub mod batch;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod matching;
pub mod models;
pub mod notify;
pub mod pending;
pub mod service;
pub mod store;
pub mod validation;
