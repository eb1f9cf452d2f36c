//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::dto::{
    BatchListResponse, BatchResponse, BulkItemRequest, CharacteristicDto, CharacteristicRequest,
    CreateBulkRequest, HealthResponse, ItemListResponse, ItemResponse, ListBatchesQuery,
    ListItemsQuery, ReportResponse, ServiceStatus,
};
use crate::handlers::{bulk, health, report};

/// OpenAPI documentation for the bulk API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bulk Resource API",
        version = "1.0.0",
        description = "Bulk create and update of inventory resources.

A batch carries one intent (create or update) for many items. Items are applied
to the logical or physical inventory concurrently, each item records its own
outcome, and a CSV report is produced once per batch.

## Quick Start

1. Submit a batch: `POST /api/v1/bulk`
2. Poll progress: `GET /api/v1/bulk/{id}`
3. Download the report: `GET /api/v1/bulk/{id}/report/download`
",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        health::health_check,
        bulk::create_batch,
        bulk::list_batches,
        bulk::get_batch,
        bulk::list_items,
        report::get_report,
        report::download_report,
        report::finalize_report,
    ),
    components(
        schemas(
            // Request types
            CreateBulkRequest,
            BulkItemRequest,
            CharacteristicRequest,
            ListBatchesQuery,
            ListItemsQuery,
            // Response types
            HealthResponse,
            ServiceStatus,
            BatchResponse,
            BatchListResponse,
            ItemResponse,
            ItemListResponse,
            CharacteristicDto,
            ReportResponse,
        )
    ),
    tags(
        (name = "system", description = "System health"),
        (name = "bulk", description = "Batch intake and progress"),
        (name = "reports", description = "Completion reports"),
    )
)]
pub struct ApiDoc;
