use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use bulk_client::InventoryClient;
use bulk_core::{BulkProcessor, ProcessorConfig};
use bulk_db::{BatchRepository, BlobRepository, ItemRepository, ReportRepository};

/// The processor wired to PostgreSQL stores and the HTTP inventory client.
pub type Processor =
    BulkProcessor<InventoryClient, ItemRepository, BatchRepository, ReportRepository, BlobRepository>;

/// Shared application state for all handlers.
///
/// Every field is cheap to clone (pools and clients are `Arc`-backed).
#[derive(Clone)]
pub struct AppState {
    /// Runs batches and finalizes their reports
    pub processor: Processor,

    /// Batch intake and queries
    pub batch_repo: BatchRepository,

    pub item_repo: ItemRepository,

    pub report_repo: ReportRepository,

    /// Background batch runs, awaited on shutdown
    pub tasks: TaskTracker,

    /// Cancellation token for graceful shutdown
    pub shutdown_token: CancellationToken,
}

impl AppState {
    /// Creates a new application state with all services initialized.
    pub fn new(
        pool: PgPool,
        logical: InventoryClient,
        physical: InventoryClient,
        config: ProcessorConfig,
        shutdown_token: CancellationToken,
    ) -> Self {
        let batch_repo = BatchRepository::new(pool.clone());
        let item_repo = ItemRepository::new(pool.clone());
        let report_repo = ReportRepository::new(pool.clone());
        let blob_repo = BlobRepository::new(pool);

        Self {
            processor: BulkProcessor::with_config(
                logical,
                physical,
                item_repo.clone(),
                batch_repo.clone(),
                report_repo.clone(),
                blob_repo,
                config,
            ),
            batch_repo,
            item_repo,
            report_repo,
            tasks: TaskTracker::new(),
            shutdown_token,
        }
    }
}
