//! Batch intake and query endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::dto::{
    BatchListResponse, BatchResponse, CreateBulkRequest, ItemListResponse, ItemResponse,
    ListBatchesQuery, ListItemsQuery,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Submit a bulk batch.
///
/// Persists the batch and its items as pending, starts processing in the
/// background and returns immediately. Poll GET /api/v1/bulk/{id} for
/// progress.
#[utoipa::path(
    post,
    path = "/api/v1/bulk",
    request_body = CreateBulkRequest,
    responses(
        (status = 202, description = "Batch accepted", body = BatchResponse),
        (status = 400, description = "Invalid batch"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "bulk"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBulkRequest>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    let (new_batch, new_items) = request.into_intake()?;

    let (batch, items) = state
        .batch_repo
        .create_with_items(&new_batch, &new_items)
        .await
        .map_err(ApiError::from)?;

    tracing::info!(
        batch_id = %batch.id,
        operation = %batch.operation,
        category = %batch.category,
        items = batch.total,
        "Batch accepted"
    );

    let processor = state.processor.clone();
    let cancel = state.shutdown_token.child_token();
    let run = batch.clone();
    state.tasks.spawn(async move {
        let counts = processor.process(&run, items, cancel).await;
        tracing::debug!(
            batch_id = %run.id,
            processed = counts.processed,
            "Background batch run finished"
        );
    });

    Ok((StatusCode::ACCEPTED, Json(BatchResponse::from(batch))))
}

/// List recent batches.
#[utoipa::path(
    get,
    path = "/api/v1/bulk",
    params(ListBatchesQuery),
    responses(
        (status = 200, description = "Recent batches", body = BatchListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "bulk"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(params): Query<ListBatchesQuery>,
) -> Result<Json<BatchListResponse>, ApiError> {
    let status = params.status()?;

    let batches = state
        .batch_repo
        .list(status, params.limit())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(BatchListResponse {
        count: batches.len(),
        batches: batches.into_iter().map(BatchResponse::from).collect(),
    }))
}

/// Get a batch with its counts and progress.
#[utoipa::path(
    get,
    path = "/api/v1/bulk/{id}",
    params(("id" = Uuid, Path, description = "Batch UUID")),
    responses(
        (status = 200, description = "Batch found", body = BatchResponse),
        (status = 404, description = "Batch not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "bulk"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchResponse>, ApiError> {
    let batch = state
        .batch_repo
        .get(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("Batch not found: {}", id)))?;

    Ok(Json(BatchResponse::from(batch)))
}

/// List the items of a batch, in submission order.
#[utoipa::path(
    get,
    path = "/api/v1/bulk/{id}/items",
    params(("id" = Uuid, Path, description = "Batch UUID"), ListItemsQuery),
    responses(
        (status = 200, description = "Batch items", body = ItemListResponse),
        (status = 400, description = "Invalid status filter"),
        (status = 404, description = "Batch not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "bulk"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListItemsQuery>,
) -> Result<Json<ItemListResponse>, ApiError> {
    let status = params.status()?;

    if state.batch_repo.get(id).await.map_err(ApiError::from)?.is_none() {
        return Err(ApiError::NotFound(format!("Batch not found: {}", id)));
    }

    let items = state
        .item_repo
        .list(id, status)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ItemListResponse {
        batch_id: id,
        count: items.len(),
        items: items.into_iter().map(ItemResponse::from).collect(),
    }))
}
