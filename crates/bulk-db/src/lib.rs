//! Bulk DB - PostgreSQL store layer for bulk processing.
//!
//! This crate implements the storage traits of `bulk-core`:
//!
//! - [`BatchRepository`] - batch intake, queries and aggregate writes
//! - [`ItemRepository`] - per-item terminal status and enumeration
//! - [`ReportRepository`] - insert-if-absent report rows
//! - [`BlobRepository`] - report CSV files keyed by name

mod batch_repository;
mod report_repository;

use sqlx::PgPool;

use bulk_core::error::AppError;

pub use batch_repository::{BatchRepository, ItemRepository};
pub use report_repository::{BlobRepository, ReportRepository};

/// Schema of the bulk tables. Every statement is idempotent.
pub const SCHEMA_SQL: &str = include_str!("../migrations/001_init.sql");

/// Applies [`SCHEMA_SQL`] to the database.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
