//! Bulk processor: bounded worker pool and batch coordinator.
//!
//! # Run
//!
//! 1. Mark the batch `processing` and skip items that are not pending.
//! 2. Feed pending items, in order, to at most `workers` concurrently
//!    running item tasks. An item is only taken when a slot is free.
//! 3. Each task applies its item, writes the terminal status once and bumps
//!    the shared tally.
//! 4. After every task has finished: write counts, mark the batch
//!    `completed`, finalize the report.
//!
//! Cancellation stops the feed. In-flight items finish normally; items never
//! dispatched stay `pending` and the run is reported as incomplete.
//!
//! # Example
//!
//! ```ignore
//! use bulk_core::{BulkProcessor, ProcessorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let processor = BulkProcessor::with_config(
//!     logical, physical, item_repo, batch_repo, report_repo, blob_repo,
//!     ProcessorConfig::default().with_workers(4),
//! );
//! let counts = processor.process(&batch, items, CancellationToken::new()).await;
//! ```

use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::applier::ItemApplier;
use crate::config::ProcessorConfig;
use crate::models::{Batch, BatchCounts, BatchStatus, Item, ItemStatus};
use crate::progress::{BulkEvent, BulkReporter, TracingReporter};
use crate::report::ReportFinalizer;
use crate::status::{AtomicTally, ItemOutcome, StatusSink};
use crate::traits::{BatchStore, BlobStore, ItemStore, ReportStore, ResourceInventory};

/// Drives one batch from pending items to a finalized report.
///
/// Generic over the inventory surface and the four stores, so the same
/// coordinator runs against PostgreSQL in the server and in-memory mocks in
/// tests.
pub struct BulkProcessor<I, IS, BS, RS, BL>
where
    I: ResourceInventory,
    IS: ItemStore,
    BS: BatchStore,
    RS: ReportStore,
    BL: BlobStore,
{
    applier: ItemApplier<I>,
    sink: StatusSink<IS, BS>,
    finalizer: ReportFinalizer<IS, RS, BL>,
    config: ProcessorConfig,
}

impl<I, IS, BS, RS, BL> Clone for BulkProcessor<I, IS, BS, RS, BL>
where
    I: ResourceInventory,
    IS: ItemStore,
    BS: BatchStore,
    RS: ReportStore,
    BL: BlobStore,
{
    fn clone(&self) -> Self {
        Self {
            applier: self.applier.clone(),
            sink: self.sink.clone(),
            finalizer: self.finalizer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<I, IS, BS, RS, BL> BulkProcessor<I, IS, BS, RS, BL>
where
    I: ResourceInventory,
    IS: ItemStore,
    BS: BatchStore,
    RS: ReportStore,
    BL: BlobStore,
{
    /// Creates a processor with the default configuration.
    pub fn new(logical: I, physical: I, items: IS, batches: BS, reports: RS, blobs: BL) -> Self {
        Self::with_config(
            logical,
            physical,
            items,
            batches,
            reports,
            blobs,
            ProcessorConfig::default(),
        )
    }

    pub fn with_config(
        logical: I,
        physical: I,
        items: IS,
        batches: BS,
        reports: RS,
        blobs: BL,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            applier: ItemApplier::with_config(logical, physical, &config),
            sink: StatusSink::new(items.clone(), batches),
            finalizer: ReportFinalizer::new(items, reports, blobs),
            config,
        }
    }

    /// The report finalizer used after each run, for re-finalization and
    /// downloads outside a run.
    pub fn finalizer(&self) -> &ReportFinalizer<IS, RS, BL> {
        &self.finalizer
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Processes a batch, logging progress through `tracing`.
    ///
    /// Returns the counts of this run. Failures never abort the run; they
    /// are recorded on items or logged.
    pub async fn process(
        &self,
        batch: &Batch,
        items: Vec<Item>,
        cancel: CancellationToken,
    ) -> BatchCounts {
        self.process_with_progress(batch, items, cancel, &TracingReporter)
            .await
    }

    /// Processes a batch with custom progress reporting.
    pub async fn process_with_progress<R: BulkReporter>(
        &self,
        batch: &Batch,
        items: Vec<Item>,
        cancel: CancellationToken,
        reporter: &R,
    ) -> BatchCounts {
        let workers = self.config.workers.max(1);

        if batch.status.transition_to(BatchStatus::Processing).is_ok() {
            if let Err(e) = self.sink.mark_processing(batch.id).await {
                warn!(batch_id = %batch.id, error = %e, "Failed to mark batch processing");
            }
        }

        let (pending, skipped): (Vec<Item>, Vec<Item>) = items
            .into_iter()
            .partition(|item| item.status == ItemStatus::Pending);
        for item in &skipped {
            reporter.report(BulkEvent::ItemSkipped {
                item_id: item.id,
                status: item.status,
            });
        }

        let queued = pending.len();
        reporter.report(BulkEvent::BatchStarted {
            batch_id: batch.id,
            total: queued,
            workers,
        });

        let tally = AtomicTally::new();

        stream::iter(pending)
            .take_until(cancel.cancelled())
            .map(|item| self.run_item(batch, item, &tally, reporter))
            .buffer_unordered(workers)
            .collect::<()>()
            .await;

        // Every item task has completed; the tally is no longer shared.
        let counts = tally.into_counts();

        if counts.processed < queued {
            reporter.report(BulkEvent::BatchIncomplete {
                batch_id: batch.id,
                dispatched: counts.processed,
                pending: queued - counts.processed,
            });
        }

        if let Err(e) = self.sink.aggregate_and_close(batch.id, counts).await {
            error!(batch_id = %batch.id, error = %e, "Failed to persist batch aggregates");
        }
        reporter.report(BulkEvent::BatchCompleted {
            batch_id: batch.id,
            counts,
        });

        match self.finalizer.finalize(batch.id).await {
            Ok(report) => reporter.report(BulkEvent::ReportReady { report: &report }),
            Err(e) => {
                let message = e.to_string();
                reporter.report(BulkEvent::ReportFailed {
                    batch_id: batch.id,
                    error: &message,
                });
            }
        }

        counts
    }

    async fn run_item<R: BulkReporter>(
        &self,
        batch: &Batch,
        item: Item,
        tally: &AtomicTally,
        reporter: &R,
    ) {
        let result = self.applier.apply(batch, &item).await;
        if let Err(e) = &result {
            info!(batch_id = %batch.id, item_id = %item.id, error = %e, "Item failed");
        }

        let outcome = ItemOutcome::from_result(result);
        if let Err(e) = self.sink.record_terminal(item.id, &outcome).await {
            // Counted regardless; the item row may still read pending.
            error!(item_id = %item.id, error = %e, "Failed to persist item status");
        }
        tally.record(outcome.status());

        reporter.report(BulkEvent::ItemCompleted {
            item_id: item.id,
            status: outcome.status(),
            error: outcome.error_message(),
        });
    }
}
