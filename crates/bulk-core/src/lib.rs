//! Bulk Core - Domain types and the bulk processing engine.
//!
//! This crate provides the core of bulk resource processing:
//!
//! - **Domain models**: [`Batch`], [`Item`], [`Report`] and their status enums
//! - **Item applier**: [`ItemApplier`] turns one item into one inventory call
//! - **Status sink**: [`StatusSink`] and [`AtomicTally`] for per-item and aggregate status
//! - **Worker pool**: [`BulkProcessor`] runs a batch with bounded concurrency
//! - **Report finalizer**: [`ReportFinalizer`] writes one CSV report per batch
//! - **Traits**: [`ItemStore`], [`BatchStore`], [`ReportStore`], [`BlobStore`],
//!   [`ResourceInventory`] for dependency injection
//! - **Progress reporting**: [`BulkReporter`] for decoupled logging
//!
//! # Architecture
//!
//! Storage and the inventory service are reached only through traits.
//! `bulk-db` implements the stores on PostgreSQL, `bulk-client` implements
//! the inventory over HTTP, and `bulk-server` wires them into an API.

pub mod applier;
pub mod config;
pub mod error;
pub mod models;
pub mod processor;
pub mod progress;
pub mod report;
pub mod status;
pub mod traits;

// Configuration
pub use config::{DEFAULT_CALL_TIMEOUT, DEFAULT_WORKERS, ProcessorConfig, RetryPolicy};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{
    Batch, BatchCounts, BatchStatus, BlobRef, CHAR_MOBILE_CLASS, CHAR_MSISDN, Characteristic,
    Item, ItemPayload, ItemStatus, NewBatch, NewItem, NewReport, OperationKind, ParseEnumError,
    Report, ResourceCategory, ResourcePayload,
};

// Engine components
pub use applier::{ApplyStrategy, ItemApplier};
pub use processor::BulkProcessor;
pub use report::{ReportFinalizer, ReportShape, report_blob_name};
pub use status::{AtomicTally, ItemOutcome, StatusSink};

// Progress reporting
pub use progress::{BulkEvent, BulkReporter, SilentReporter, TracingReporter};

// Traits for dependency injection
pub use traits::{BatchStore, BlobStore, ItemStore, ReportStore, ResourceInventory};
