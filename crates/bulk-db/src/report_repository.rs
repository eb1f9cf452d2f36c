//! Report and report blob repositories for PostgreSQL.
//!
//! Both inserts use `ON CONFLICT DO NOTHING` on their natural key (batch id
//! for reports, name for blobs) followed by a re-select, so racing
//! finalizations converge on the first row written.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use bulk_core::error::AppError;
use bulk_core::models::{BlobRef, NewReport, Report};
use bulk_core::traits::{BlobStore, ReportStore};

/// Helper struct for deserializing report rows from the database.
#[derive(sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    batch_id: Uuid,
    total_items: i32,
    success_count: i32,
    failure_count: i32,
    blob_id: Uuid,
    blob_name: String,
    created_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            batch_id: row.batch_id,
            total: row.total_items as usize,
            success: row.success_count as usize,
            failure: row.failure_count as usize,
            blob: BlobRef {
                id: row.blob_id,
                name: row.blob_name,
            },
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Report Repository
// =============================================================================

/// PostgreSQL repository for batch reports.
#[derive(Clone)]
pub struct ReportRepository {
    pool: Pool<Postgres>,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReportStore for ReportRepository {
    async fn find_by_batch(&self, batch_id: Uuid) -> Result<Option<Report>, AppError> {
        let row: Option<ReportRow> =
            sqlx::query_as("SELECT * FROM bulk_reports WHERE batch_id = $1")
                .bind(batch_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn create_if_absent(&self, report: NewReport) -> Result<Report, AppError> {
        let inserted: Option<ReportRow> = sqlx::query_as(
            r#"
            INSERT INTO bulk_reports (batch_id, total_items, success_count, failure_count, blob_id, blob_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (batch_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(report.batch_id)
        .bind(report.total as i32)
        .bind(report.success as i32)
        .bind(report.failure as i32)
        .bind(report.blob.id)
        .bind(&report.blob.name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(row.into());
        }

        tracing::debug!(batch_id = %report.batch_id, "Report already stored by a concurrent finalization");
        let existing: ReportRow = sqlx::query_as("SELECT * FROM bulk_reports WHERE batch_id = $1")
            .bind(report.batch_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(existing.into())
    }
}

// =============================================================================
// Blob Repository
// =============================================================================

/// PostgreSQL storage for report files, keyed by unique name.
#[derive(Clone)]
pub struct BlobRepository {
    pool: Pool<Postgres>,
}

impl BlobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BlobStore for BlobRepository {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<BlobRef, AppError> {
        let inserted: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            INSERT INTO bulk_report_blobs (name, content)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            RETURNING id, name
            "#,
        )
        .bind(name)
        .bind(bytes)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name) = match inserted {
            Some(row) => row,
            None => {
                sqlx::query_as("SELECT id, name FROM bulk_report_blobs WHERE name = $1")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(BlobRef { id, name })
    }

    async fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, AppError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT content FROM bulk_report_blobs WHERE id = $1")
                .bind(blob.id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(content,)| content)
            .ok_or_else(|| AppError::Generic(format!("Report blob not found: {}", blob.name)))
    }
}
