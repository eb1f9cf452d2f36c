//! Status sink: per-item terminal writes and batch aggregation.

use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{BatchCounts, BatchStatus, ItemStatus};
use crate::traits::{BatchStore, ItemStore};

// =============================================================================
// Item Outcome
// =============================================================================

/// Terminal outcome of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    Failure(String),
}

impl ItemOutcome {
    pub fn from_result(result: Result<(), AppError>) -> Self {
        match result {
            Ok(()) => ItemOutcome::Success,
            Err(e) => ItemOutcome::Failure(e.to_string()),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            ItemOutcome::Success => ItemStatus::Success,
            ItemOutcome::Failure(_) => ItemStatus::Failure,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ItemOutcome::Success => None,
            ItemOutcome::Failure(msg) => Some(msg),
        }
    }
}

// =============================================================================
// Atomic Tally
// =============================================================================

/// Lock-free success/failure counters shared by concurrently running items.
///
/// Counts can only be read out by value through [`AtomicTally::into_counts`],
/// which requires sole ownership, i.e. after every item task has finished.
#[derive(Debug, Default)]
pub struct AtomicTally {
    success: AtomicUsize,
    failure: AtomicUsize,
}

impl AtomicTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: ItemStatus) {
        match status {
            ItemStatus::Success => {
                self.success.fetch_add(1, Ordering::Relaxed);
            }
            ItemStatus::Failure => {
                self.failure.fetch_add(1, Ordering::Relaxed);
            }
            ItemStatus::Pending => {}
        }
    }

    pub fn into_counts(self) -> BatchCounts {
        BatchCounts::new(self.success.into_inner(), self.failure.into_inner())
    }
}

// =============================================================================
// Status Sink
// =============================================================================

/// Writes item and batch status through the configured stores.
pub struct StatusSink<IS, BS>
where
    IS: ItemStore,
    BS: BatchStore,
{
    items: IS,
    batches: BS,
}

impl<IS, BS> Clone for StatusSink<IS, BS>
where
    IS: ItemStore,
    BS: BatchStore,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            batches: self.batches.clone(),
        }
    }
}

impl<IS, BS> StatusSink<IS, BS>
where
    IS: ItemStore,
    BS: BatchStore,
{
    pub fn new(items: IS, batches: BS) -> Self {
        Self { items, batches }
    }

    /// Persists the terminal status of one item.
    pub async fn record_terminal(&self, item_id: Uuid, outcome: &ItemOutcome) -> Result<(), AppError> {
        self.items
            .write_terminal_status(item_id, outcome.status(), outcome.error_message())
            .await
    }

    pub async fn mark_processing(&self, batch_id: Uuid) -> Result<(), AppError> {
        self.batches
            .write_status(batch_id, BatchStatus::Processing)
            .await
    }

    /// Writes the aggregate counts, then marks the batch completed.
    ///
    /// The status is written even if the count write failed; both errors
    /// are reported, counts first.
    pub async fn aggregate_and_close(
        &self,
        batch_id: Uuid,
        counts: BatchCounts,
    ) -> Result<(), AppError> {
        let counts_result = self.batches.write_counts(batch_id, counts).await;
        let status_result = self
            .batches
            .write_status(batch_id, BatchStatus::Completed)
            .await;
        counts_result.and(status_result)
    }
}
