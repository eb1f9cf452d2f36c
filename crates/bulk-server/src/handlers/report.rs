//! Report endpoints.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{Response, StatusCode, header},
};
use uuid::Uuid;

use bulk_core::{BatchStatus, ReportStore};

use crate::dto::ReportResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Get the completion report of a batch.
///
/// Returns 404 until the batch has been finalized.
#[utoipa::path(
    get,
    path = "/api/v1/bulk/{id}/report",
    params(("id" = Uuid, Path, description = "Batch UUID")),
    responses(
        (status = 200, description = "Report found", body = ReportResponse),
        (status = 404, description = "No report for this batch"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state
        .report_repo
        .find_by_batch(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("No report for batch {}", id)))?;

    Ok(Json(ReportResponse::from(report)))
}

/// Download the report CSV of a batch.
#[utoipa::path(
    get,
    path = "/api/v1/bulk/{id}/report/download",
    params(("id" = Uuid, Path, description = "Batch UUID")),
    responses(
        (status = 200, description = "Report CSV", body = String, content_type = "text/csv"),
        (status = 404, description = "No report for this batch"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "reports"
)]
pub async fn download_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response<Body>, ApiError> {
    let (report, bytes) = state
        .processor
        .finalizer()
        .download(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("No report for batch {}", id)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.blob.name),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// Finalize the report of a completed batch.
///
/// Idempotent: once a report exists it is returned unchanged. Use this to
/// recover from a finalization that failed at the end of a run.
#[utoipa::path(
    post,
    path = "/api/v1/bulk/{id}/finalize",
    params(("id" = Uuid, Path, description = "Batch UUID")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 404, description = "Batch not found"),
        (status = 409, description = "Batch is still running"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "reports"
)]
pub async fn finalize_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportResponse>, ApiError> {
    let batch = state
        .batch_repo
        .get(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Batch not found: {}", id)))?;

    if batch.status != BatchStatus::Completed {
        return Err(ApiError::Conflict(format!(
            "Batch {} is {}, reports are finalized after completion",
            id, batch.status
        )));
    }

    let report = state
        .processor
        .finalizer()
        .finalize(id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ReportResponse::from(report)))
}
