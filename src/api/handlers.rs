//! HTTP request handlers for the reconciliation API.
//!
//! Every handler tags its log events with a fresh correlation id.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{delete, get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cleanup::{BulkAction, BulkReport, CleanupReport};
use crate::matching::{AssignmentOutcome, AutoAssignReport};
use crate::models::{BatchProgress, PendingStatusUpdate, TrafficFine, ValidationLogEntry};
use crate::pending::ConfirmAllReport;
use crate::service::ManualValidation;
use crate::validation::BatchValidationOutcome;

use super::request::{BatchValidationRequest, BulkRequest};
use super::response::ApiErrorResponse;
use super::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiErrorResponse>;

/// Response body for `DELETE /pending`.
#[derive(Debug, Serialize)]
struct DismissedCount {
    dismissed: usize,
}

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/validations/batch", post(validate_batch_handler))
        .route("/validations/progress", get(validation_progress_handler))
        .route("/validations/:plate/history", get(validation_history_handler))
        .route("/fines/bulk", post(bulk_handler))
        .route("/fines/:id/validate", post(validate_fine_handler))
        .route("/fines/:id/assign", post(assign_fine_handler))
        .route("/assignments/auto-assign", post(auto_assign_handler))
        .route("/assignments/cleanup", post(cleanup_handler))
        .route("/jobs/progress", get(job_progress_handler))
        .route("/pending", get(list_pending_handler).delete(dismiss_all_handler))
        .route("/pending/confirm", post(confirm_all_handler))
        .route("/pending/:id/confirm", post(confirm_one_handler))
        .route("/pending/:id", delete(dismiss_one_handler))
        .with_state(state)
}

fn rejected(correlation_id: Uuid, rejection: JsonRejection) -> ApiErrorResponse {
    warn!(
        correlation_id = %correlation_id,
        error = %rejection.body_text(),
        "rejected request body"
    );
    rejection.into()
}

fn failed<E>(correlation_id: Uuid, error: E) -> ApiErrorResponse
where
    E: Into<ApiErrorResponse> + std::fmt::Display,
{
    warn!(correlation_id = %correlation_id, error = %error, "request failed");
    error.into()
}

/// Handler for POST /validations/batch.
async fn validate_batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<BatchValidationRequest>, JsonRejection>,
) -> ApiResult<BatchValidationOutcome> {
    let correlation_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|rejection| rejected(correlation_id, rejection))?;
    info!(
        correlation_id = %correlation_id,
        plates = request.license_plates.len(),
        "processing batch validation request"
    );

    let outcome = state
        .reconciler()
        .validate_batch(&request.license_plates, request.options)
        .await
        .map_err(|e| failed(correlation_id, e))?;
    info!(
        correlation_id = %correlation_id,
        succeeded = outcome.summary.succeeded,
        failed = outcome.summary.failed,
        "batch validation request complete"
    );
    Ok(Json(outcome))
}

/// Handler for GET /validations/progress.
async fn validation_progress_handler(State(state): State<AppState>) -> Json<BatchProgress> {
    Json(state.reconciler().validation_progress())
}

/// Handler for GET /validations/:plate/history.
async fn validation_history_handler(
    State(state): State<AppState>,
    Path(plate): Path<String>,
) -> ApiResult<Vec<ValidationLogEntry>> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, license_plate = %plate, "loading validation history");
    state
        .reconciler()
        .validation_history(&plate)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for POST /fines/:id/validate.
async fn validate_fine_handler(
    State(state): State<AppState>,
    Path(fine_id): Path<String>,
) -> ApiResult<ManualValidation> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, fine_id = %fine_id, "validating fine");
    state
        .reconciler()
        .validate_fine(&fine_id)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for POST /fines/:id/assign.
async fn assign_fine_handler(
    State(state): State<AppState>,
    Path(fine_id): Path<String>,
) -> ApiResult<AssignmentOutcome> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, fine_id = %fine_id, "assigning fine");
    state
        .reconciler()
        .assign_fine(&fine_id)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for POST /fines/bulk.
async fn bulk_handler(
    State(state): State<AppState>,
    payload: Result<Json<BulkRequest>, JsonRejection>,
) -> ApiResult<BulkReport> {
    let correlation_id = Uuid::new_v4();
    let Json(request) = payload.map_err(|rejection| rejected(correlation_id, rejection))?;
    let action: BulkAction = request.action.parse().map_err(|e| failed(correlation_id, e))?;
    info!(
        correlation_id = %correlation_id,
        action = %action,
        fines = request.fine_ids.len(),
        "processing bulk request"
    );

    state
        .reconciler()
        .bulk_process_fines(&request.fine_ids, action)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for POST /assignments/auto-assign.
async fn auto_assign_handler(State(state): State<AppState>) -> ApiResult<AutoAssignReport> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "running auto-assignment");
    state
        .reconciler()
        .auto_assign_unassigned()
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for POST /assignments/cleanup.
async fn cleanup_handler(State(state): State<AppState>) -> ApiResult<CleanupReport> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "running assignment cleanup");
    state
        .reconciler()
        .cleanup_invalid_assignments(None)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for GET /jobs/progress.
async fn job_progress_handler(State(state): State<AppState>) -> Json<BatchProgress> {
    Json(state.reconciler().job_progress())
}

/// Handler for GET /pending.
async fn list_pending_handler(State(state): State<AppState>) -> Json<Vec<PendingStatusUpdate>> {
    Json(state.reconciler().list_pending().await)
}

/// Handler for POST /pending/confirm.
async fn confirm_all_handler(State(state): State<AppState>) -> Json<ConfirmAllReport> {
    let correlation_id = Uuid::new_v4();
    let report = state.reconciler().confirm_all_status_updates().await;
    info!(
        correlation_id = %correlation_id,
        succeeded = report.succeeded,
        failed = report.failed,
        "confirmed all pending updates"
    );
    Json(report)
}

/// Handler for POST /pending/:id/confirm.
async fn confirm_one_handler(
    State(state): State<AppState>,
    Path(fine_id): Path<String>,
) -> ApiResult<TrafficFine> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, fine_id = %fine_id, "confirming pending update");
    state
        .reconciler()
        .confirm_status_update(&fine_id)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

/// Handler for DELETE /pending.
async fn dismiss_all_handler(State(state): State<AppState>) -> Json<DismissedCount> {
    Json(DismissedCount {
        dismissed: state.reconciler().dismiss_all_status_updates().await,
    })
}

/// Handler for DELETE /pending/:id.
async fn dismiss_one_handler(
    State(state): State<AppState>,
    Path(fine_id): Path<String>,
) -> ApiResult<PendingStatusUpdate> {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, fine_id = %fine_id, "dismissing pending update");
    state
        .reconciler()
        .dismiss_status_update(&fine_id)
        .await
        .map(Json)
        .map_err(|e| failed(correlation_id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::authority::ScriptedAuthority;
    use crate::batch::NoDelay;
    use crate::service::FineReconciler;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let reconciler = FineReconciler::builder(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedAuthority::new().with_fine("OWING1")),
        )
        .throttle(Arc::new(NoDelay))
        .build();
        AppState::new(Arc::new(reconciler))
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_batch_validation_returns_200() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(json_request(
                "POST",
                "/validations/batch",
                r#"{"license_plates": ["OWING1", "CLEAR1"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type, "application/json");

        let outcome: BatchValidationOutcome = read_json(response).await;
        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(json_request("POST", "/validations/batch", "{invalid json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(json_request("POST", "/validations/batch", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_reassign_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(json_request(
                "POST",
                "/fines/bulk",
                r#"{"fine_ids": ["f1"], "action": "reassign"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, "UNSUPPORTED_BULK_ACTION");
    }

    #[tokio::test]
    async fn test_unknown_fine_returns_404() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(json_request("POST", "/fines/missing/assign", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error: ApiError = read_json(response).await;
        assert_eq!(error.code, "FINE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_dismiss_unknown_pending_returns_404() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/pending/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_progress_starts_complete() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/validations/progress")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let progress: BatchProgress = read_json(response).await;
        assert_eq!(progress.total, 0);
        assert_eq!(progress.percent_complete, 100);
    }
}
