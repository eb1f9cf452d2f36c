//! Response DTOs for API endpoints.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use bulk_core::{Batch, Characteristic, Item, ItemPayload, Report};

// =============================================================================
// Health
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("healthy" or "degraded")
    pub status: String,
    /// Server version
    pub version: String,
    /// Database connectivity status
    pub database: ServiceStatus,
}

/// Status of an individual service component.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    /// Whether the service is reachable
    pub healthy: bool,
    /// Optional message (e.g., error details)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Batches
// =============================================================================

/// A bulk batch with its progress.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    pub id: Uuid,
    /// create or update
    pub operation: String,
    /// LogicalResource or PhysicalResource
    pub category: String,
    pub item_type: Option<String>,
    pub file_name: Option<String>,
    pub user_name: Option<String>,
    /// Number of items in the batch
    pub total: usize,
    /// Items that reached a terminal status in the last run
    pub processed: usize,
    pub success: usize,
    pub failure: usize,
    /// pending, processing or completed
    pub status: String,
    /// Completed while some items were never dispatched
    pub incomplete: bool,
    pub progress_percent: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Batch> for BatchResponse {
    fn from(b: Batch) -> Self {
        Self {
            incomplete: b.is_incomplete(),
            progress_percent: b.progress_percent(),
            id: b.id,
            operation: b.operation.to_string(),
            category: b.category.to_string(),
            item_type: b.item_type,
            file_name: b.file_name,
            user_name: b.user_name,
            total: b.total,
            processed: b.counts.processed,
            success: b.counts.success,
            failure: b.counts.failure,
            status: b.status.to_string(),
            created_at: b.created_at,
            updated_at: b.updated_at,
            completed_at: b.completed_at,
        }
    }
}

/// Batch listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchListResponse {
    pub count: usize,
    pub batches: Vec<BatchResponse>,
}

// =============================================================================
// Items
// =============================================================================

/// Characteristic of a create item.
#[derive(Debug, Serialize, ToSchema)]
pub struct CharacteristicDto {
    pub code: String,
    pub value: String,
}

impl From<Characteristic> for CharacteristicDto {
    fn from(c: Characteristic) -> Self {
        Self {
            code: c.code,
            value: c.value,
        }
    }
}

/// One item of a batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: Uuid,
    pub value: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub category: String,
    /// pending, success or failure
    pub status: String,
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characteristics: Option<Vec<CharacteristicDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_fields: Option<BTreeMap<String, String>>,
    pub updated_at: DateTime<Utc>,
}

impl From<Item> for ItemResponse {
    fn from(i: Item) -> Self {
        let (characteristics, update_fields) = match i.payload {
            ItemPayload::Create { characteristics } => (
                Some(characteristics.into_iter().map(Into::into).collect()),
                None,
            ),
            ItemPayload::Update { fields } => (None, Some(fields)),
        };

        Self {
            id: i.id,
            value: i.value,
            resource_type: i.resource_type,
            category: i.category.to_string(),
            status: i.status.to_string(),
            error_message: i.error_message,
            characteristics,
            update_fields,
            updated_at: i.updated_at,
        }
    }
}

/// Items of a batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemListResponse {
    pub batch_id: Uuid,
    pub count: usize,
    pub items: Vec<ItemResponse>,
}

// =============================================================================
// Reports
// =============================================================================

/// Completion report of a batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    /// Name of the stored CSV file
    pub file_name: String,
    /// Relative URL of the CSV download
    pub download_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            download_url: format!("/api/v1/bulk/{}/report/download", r.batch_id),
            id: r.id,
            batch_id: r.batch_id,
            total: r.total,
            success: r.success,
            failure: r.failure,
            file_name: r.blob.name,
            created_at: r.created_at,
        }
    }
}
