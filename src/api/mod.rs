//! HTTP API for the fine reconciliation engine.
//!
//! This module exposes the [`FineReconciler`](crate::service::FineReconciler)
//! operations as JSON endpoints.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{BatchValidationRequest, BulkRequest};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
