//! Batch and item repositories for PostgreSQL.
//!
//! [`BatchRepository`] implements [`BatchStore`] and owns batch intake;
//! [`ItemRepository`] implements [`ItemStore`]. Item status writes are
//! guarded by `status = 'pending'` so a terminal status is written at most
//! once per item.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use bulk_core::error::AppError;
use bulk_core::models::{
    Batch, BatchCounts, BatchStatus, Item, ItemPayload, ItemStatus, NewBatch, NewItem,
};
use bulk_core::traits::{BatchStore, ItemStore};

// =============================================================================
// Helper Types for Database Mapping
// =============================================================================

/// Helper struct for deserializing batch rows from the database.
#[derive(sqlx::FromRow)]
struct BatchRow {
    id: Uuid,
    operation: String,
    category: String,
    item_type: Option<String>,
    file_name: Option<String>,
    user_name: Option<String>,
    total_count: i32,
    processed_count: i32,
    success_count: i32,
    failure_count: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = AppError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            operation: row.operation.parse().map_err(corrupt_row)?,
            category: row.category.parse().map_err(corrupt_row)?,
            item_type: row.item_type,
            file_name: row.file_name,
            user_name: row.user_name,
            total: row.total_count as usize,
            counts: BatchCounts {
                processed: row.processed_count as usize,
                success: row.success_count as usize,
                failure: row.failure_count as usize,
            },
            status: row.status.parse().map_err(corrupt_row)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

/// Helper struct for deserializing item rows from the database.
#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    batch_id: Uuid,
    value: String,
    resource_type: String,
    category: String,
    status: String,
    error_message: Option<String>,
    payload: Json<ItemPayload>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            batch_id: row.batch_id,
            value: row.value,
            resource_type: row.resource_type,
            category: row.category.parse().map_err(corrupt_row)?,
            status: row.status.parse().map_err(corrupt_row)?,
            error_message: row.error_message,
            payload: row.payload.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn corrupt_row(e: bulk_core::ParseEnumError) -> AppError {
    AppError::Generic(format!("corrupt row: {}", e))
}

fn rows_into<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// =============================================================================
// Batch Repository
// =============================================================================

/// PostgreSQL repository for bulk batches.
#[derive(Clone)]
pub struct BatchRepository {
    pool: Pool<Postgres>,
}

impl BatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persists a batch and its items, all pending, in one transaction.
    ///
    /// Items keep their submission order through a per-batch position.
    pub async fn create_with_items(
        &self,
        batch: &NewBatch,
        items: &[NewItem],
    ) -> Result<(Batch, Vec<Item>), AppError> {
        let mut tx = self.pool.begin().await?;

        let batch_row: BatchRow = sqlx::query_as(
            r#"
            INSERT INTO bulk_batches (operation, category, item_type, file_name, user_name, total_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(batch.operation.as_str())
        .bind(batch.category.as_str())
        .bind(&batch.item_type)
        .bind(&batch.file_name)
        .bind(&batch.user_name)
        .bind(items.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let row: ItemRow = sqlx::query_as(
                r#"
                INSERT INTO bulk_items (batch_id, position, value, resource_type, category, payload)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(batch_row.id)
            .bind(position as i32)
            .bind(&item.value)
            .bind(&item.resource_type)
            .bind(item.category.as_str())
            .bind(Json(&item.payload))
            .fetch_one(&mut *tx)
            .await?;
            created.push(Item::try_from(row)?);
        }

        tx.commit().await?;

        Ok((Batch::try_from(batch_row)?, created))
    }

    pub async fn get(&self, batch_id: Uuid) -> Result<Option<Batch>, AppError> {
        let row: Option<BatchRow> = sqlx::query_as("SELECT * FROM bulk_batches WHERE id = $1")
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Batch::try_from).transpose()
    }

    /// Lists batches, most recent first.
    pub async fn list(
        &self,
        status: Option<BatchStatus>,
        limit: usize,
    ) -> Result<Vec<Batch>, AppError> {
        let rows: Vec<BatchRow> = if let Some(s) = status {
            sqlx::query_as(
                r#"
                SELECT * FROM bulk_batches
                WHERE status = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(s.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT * FROM bulk_batches
                ORDER BY created_at DESC
                LIMIT $1
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        };

        rows_into(rows)
    }

    /// Round-trips a trivial query, for health checks.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

impl BatchStore for BatchRepository {
    async fn write_counts(&self, batch_id: Uuid, counts: BatchCounts) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE bulk_batches
            SET
                processed_count = $2,
                success_count = $3,
                failure_count = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .bind(counts.processed as i32)
        .bind(counts.success as i32)
        .bind(counts.failure as i32)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BatchNotFound(batch_id.to_string()));
        }
        Ok(())
    }

    async fn write_status(&self, batch_id: Uuid, status: BatchStatus) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE bulk_batches
            SET
                status = $2,
                updated_at = NOW(),
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END
            WHERE id = $1
            "#,
        )
        .bind(batch_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BatchNotFound(batch_id.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Item Repository
// =============================================================================

/// PostgreSQL repository for bulk items.
#[derive(Clone)]
pub struct ItemRepository {
    pool: Pool<Postgres>,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists the items of a batch, optionally filtered by status.
    pub async fn list(
        &self,
        batch_id: Uuid,
        status: Option<ItemStatus>,
    ) -> Result<Vec<Item>, AppError> {
        let rows: Vec<ItemRow> = if let Some(s) = status {
            sqlx::query_as(
                "SELECT * FROM bulk_items WHERE batch_id = $1 AND status = $2 ORDER BY position",
            )
            .bind(batch_id)
            .bind(s.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as("SELECT * FROM bulk_items WHERE batch_id = $1 ORDER BY position")
                .bind(batch_id)
                .fetch_all(&self.pool)
                .await?
        };

        rows_into(rows)
    }
}

impl ItemStore for ItemRepository {
    async fn write_terminal_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        message: Option<&str>,
    ) -> Result<(), AppError> {
        ItemStatus::Pending.transition_to(status)?;

        let result = sqlx::query(
            r#"
            UPDATE bulk_items
            SET
                status = $2,
                error_message = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(item_id)
        .bind(status.as_str())
        .bind(message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Either the item does not exist or it already left pending
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM bulk_items WHERE id = $1")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some((from,)) => Err(AppError::InvalidTransition {
                from,
                to: status.as_str().to_string(),
            }),
            None => Err(AppError::Generic(format!("Item not found: {}", item_id))),
        }
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<Item>, AppError> {
        self.list(batch_id, None).await
    }
}
