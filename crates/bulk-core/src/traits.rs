//! Trait definitions for external dependencies.
//!
//! The engine never talks to a database or the inventory service directly.
//! It is generic over these traits, so the PostgreSQL stores in `bulk-db`,
//! the HTTP client in `bulk-client` and in-memory mocks in tests are
//! interchangeable.
//!
//! # Example
//!
//! ```
//! use bulk_core::traits::ItemStore;
//! use bulk_core::{AppError, ItemStatus};
//! use uuid::Uuid;
//!
//! async fn count_failures<S: ItemStore>(store: &S, batch_id: Uuid) -> Result<usize, AppError> {
//!     let items = store.list_by_batch(batch_id).await?;
//!     Ok(items.iter().filter(|i| i.status == ItemStatus::Failure).count())
//! }
//! ```

use std::collections::BTreeMap;
use std::future::Future;

use uuid::Uuid;

use crate::{AppError, BatchCounts, BatchStatus, BlobRef, Item, ItemStatus, NewReport, Report};
use crate::models::ResourcePayload;

/// Store for per-item status and item enumeration.
pub trait ItemStore: Send + Sync + Clone {
    /// Persists the terminal status of one item. Called once per dispatched item.
    ///
    /// `message` is set only for failures.
    fn write_terminal_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        message: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Lists every item of a batch in a stable order.
    fn list_by_batch(
        &self,
        batch_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Item>, AppError>> + Send;
}

/// Store for batch-level aggregates.
pub trait BatchStore: Send + Sync + Clone {
    /// Writes the aggregate counts. Called once per batch run, after every
    /// item has reached its terminal status.
    fn write_counts(
        &self,
        batch_id: Uuid,
        counts: BatchCounts,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Writes the batch status.
    fn write_status(
        &self,
        batch_id: Uuid,
        status: BatchStatus,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Store for completion reports, keyed by batch.
pub trait ReportStore: Send + Sync + Clone {
    /// Returns the report of a batch, if one exists.
    fn find_by_batch(
        &self,
        batch_id: Uuid,
    ) -> impl Future<Output = Result<Option<Report>, AppError>> + Send;

    /// Atomically inserts the report unless one already exists for the batch.
    ///
    /// Returns the stored report: the new one, or the one that won a
    /// concurrent insert.
    fn create_if_absent(
        &self,
        report: NewReport,
    ) -> impl Future<Output = Result<Report, AppError>> + Send;
}

/// Store for report files.
pub trait BlobStore: Send + Sync + Clone {
    /// Stores `bytes` under `name`. Writing an existing name returns the
    /// existing reference instead of creating a second blob.
    fn write(
        &self,
        name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<BlobRef, AppError>> + Send;

    /// Reads a stored blob back.
    fn read(&self, blob: &BlobRef) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;
}

/// One inventory surface (logical or physical).
pub trait ResourceInventory: Send + Sync + Clone {
    /// Creates a resource and returns its identity on the inventory side.
    fn create_resource(
        &self,
        payload: &ResourcePayload,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Applies `fields` to the resource matched by `(resource_type, value)`.
    ///
    /// Fails with [`AppError::ResourceNotFound`] when nothing matches.
    fn update_by_key(
        &self,
        resource_type: &str,
        value: &str,
        fields: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
