//! Progress events emitted while a batch is processed.
//!
//! The processor reports through [`BulkReporter`] so that frontends choose
//! how (or whether) to surface progress. [`TracingReporter`] logs every
//! event; [`SilentReporter`] drops them.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::{BatchCounts, ItemStatus, Report};

// =============================================================================
// Bulk Events
// =============================================================================

/// Events emitted by the bulk processor.
#[derive(Debug, Clone)]
pub enum BulkEvent<'a> {
    /// Processing of a batch started.
    BatchStarted {
        batch_id: Uuid,
        total: usize,
        workers: usize,
    },
    /// An item was skipped because it was not pending.
    ItemSkipped {
        item_id: Uuid,
        status: ItemStatus,
    },
    /// An item reached its terminal status.
    ItemCompleted {
        item_id: Uuid,
        status: ItemStatus,
        error: Option<&'a str>,
    },
    /// Cancellation stopped dispatch with items left pending.
    BatchIncomplete {
        batch_id: Uuid,
        dispatched: usize,
        pending: usize,
    },
    /// Aggregates were written and the batch was marked completed.
    BatchCompleted {
        batch_id: Uuid,
        counts: BatchCounts,
    },
    /// The report of the batch is available.
    ReportReady { report: &'a Report },
    /// Finalization failed; it can be re-run later.
    ReportFailed { batch_id: Uuid, error: &'a str },
}

// =============================================================================
// Reporter Trait
// =============================================================================

/// Trait for reporting bulk processing events.
pub trait BulkReporter: Send + Sync {
    /// Called when a processing event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: BulkEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl BulkReporter for SilentReporter {}

/// Tracing-based reporter for server logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl BulkReporter for TracingReporter {
    fn report(&self, event: BulkEvent<'_>) {
        match event {
            BulkEvent::BatchStarted {
                batch_id,
                total,
                workers,
            } => {
                info!(%batch_id, total, workers, "Bulk processing started");
            }
            BulkEvent::ItemSkipped { item_id, status } => {
                warn!(%item_id, %status, "Skipping item that is not pending");
            }
            BulkEvent::ItemCompleted {
                item_id,
                status,
                error,
            } => {
                // Per-item noise stays at debug level
                debug!(%item_id, %status, error, "Item processed");
            }
            BulkEvent::BatchIncomplete {
                batch_id,
                dispatched,
                pending,
            } => {
                warn!(
                    %batch_id,
                    dispatched,
                    pending,
                    "Batch cancelled before all items were dispatched"
                );
            }
            BulkEvent::BatchCompleted { batch_id, counts } => {
                info!(
                    %batch_id,
                    processed = counts.processed,
                    success = counts.success,
                    failure = counts.failure,
                    "Bulk processing finished"
                );
            }
            BulkEvent::ReportReady { report } => {
                info!(
                    batch_id = %report.batch_id,
                    report_id = %report.id,
                    blob = %report.blob.name,
                    "Report ready"
                );
            }
            BulkEvent::ReportFailed { batch_id, error } => {
                error!(%batch_id, error, "Report finalization failed");
            }
        }
    }
}
