//! Application state for the reconciliation API.

use std::sync::Arc;

use crate::service::FineReconciler;

/// Shared application state.
///
/// Every handler reaches the engine through the same [`FineReconciler`], so
/// progress and pending updates are visible across requests.
#[derive(Clone)]
pub struct AppState {
    reconciler: Arc<FineReconciler>,
}

impl AppState {
    /// Creates a new application state around `reconciler`.
    pub fn new(reconciler: Arc<FineReconciler>) -> Self {
        Self { reconciler }
    }

    /// Returns the shared service.
    pub fn reconciler(&self) -> &FineReconciler {
        &self.reconciler
    }
}
