//! Persistent store boundary.
//!
//! The hosted relational store is an external collaborator. This module
//! defines the narrow [`FineRepository`] interface the engine needs, the
//! [`FinePatch`] write shape, and an in-memory implementation.

mod error;
mod memory;
mod repository;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use repository::{AssignmentChange, FinePatch, FineRepository, PaymentChange};
