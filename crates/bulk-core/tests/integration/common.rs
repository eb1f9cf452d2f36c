//! Test utilities and mock implementations for integration tests.
//!
//! The mocks keep their state behind `Arc<Mutex<..>>` so a test can hand a
//! clone to the processor and inspect the shared history afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bulk_core::traits::{BatchStore, BlobStore, ItemStore, ReportStore, ResourceInventory};
use bulk_core::{
    AppError, Batch, BatchCounts, BatchStatus, BlobRef, BulkEvent, BulkProcessor, BulkReporter,
    CHAR_MOBILE_CLASS, CHAR_MSISDN, Characteristic, Item, ItemPayload, ItemStatus, NewReport,
    OperationKind, ProcessorConfig, Report, ResourceCategory, ResourcePayload,
};
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

// =============================================================================
// MockItemStore
// =============================================================================

/// In-memory item store. Status writes go through the item lifecycle, so a
/// second terminal write for the same item is rejected.
#[derive(Clone, Default)]
pub struct MockItemStore {
    pub items: Arc<Mutex<Vec<Item>>>,
    pub status_writes: Arc<AtomicUsize>,
    pub fail_writes: bool,
}

impl MockItemStore {
    pub fn with_items(items: &[Item]) -> Self {
        Self {
            items: Arc::new(Mutex::new(items.to_vec())),
            ..Default::default()
        }
    }

    pub fn failing_writes(items: &[Item]) -> Self {
        Self {
            fail_writes: true,
            ..Self::with_items(items)
        }
    }

    pub fn statuses(&self) -> Vec<ItemStatus> {
        self.items.lock().unwrap().iter().map(|i| i.status).collect()
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.statuses().into_iter().filter(|s| *s == status).count()
    }

    pub fn get(&self, id: Uuid) -> Item {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .unwrap()
    }
}

impl ItemStore for MockItemStore {
    async fn write_terminal_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        message: Option<&str>,
    ) -> Result<(), AppError> {
        self.status_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(AppError::Generic("item store unavailable".to_string()));
        }

        let mut items = self.items.lock().unwrap();
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| AppError::Generic(format!("unknown item {}", item_id)))?;
        item.status = item.status.transition_to(status)?;
        item.error_message = message.map(str::to_string);
        item.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_batch(&self, batch_id: Uuid) -> Result<Vec<Item>, AppError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.batch_id == batch_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// MockBatchStore
// =============================================================================

/// Records every count and status write.
#[derive(Clone, Default)]
pub struct MockBatchStore {
    pub counts: Arc<Mutex<Vec<BatchCounts>>>,
    pub statuses: Arc<Mutex<Vec<BatchStatus>>>,
}

impl BatchStore for MockBatchStore {
    async fn write_counts(&self, _batch_id: Uuid, counts: BatchCounts) -> Result<(), AppError> {
        self.counts.lock().unwrap().push(counts);
        Ok(())
    }

    async fn write_status(&self, _batch_id: Uuid, status: BatchStatus) -> Result<(), AppError> {
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }
}

// =============================================================================
// MockReportStore & MockBlobStore
// =============================================================================

/// Report store with insert-if-absent semantics keyed by batch.
#[derive(Clone, Default)]
pub struct MockReportStore {
    pub reports: Arc<Mutex<HashMap<Uuid, Report>>>,
    pub inserts: Arc<AtomicUsize>,
}

impl ReportStore for MockReportStore {
    async fn find_by_batch(&self, batch_id: Uuid) -> Result<Option<Report>, AppError> {
        Ok(self.reports.lock().unwrap().get(&batch_id).cloned())
    }

    async fn create_if_absent(&self, report: NewReport) -> Result<Report, AppError> {
        let mut reports = self.reports.lock().unwrap();
        let stored = reports.entry(report.batch_id).or_insert_with(|| {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Report {
                id: Uuid::new_v4(),
                batch_id: report.batch_id,
                total: report.total,
                success: report.success,
                failure: report.failure,
                blob: report.blob,
                created_at: Utc::now(),
            }
        });
        Ok(stored.clone())
    }
}

/// Blob store keyed by name. Writing an existing name keeps the first blob.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    pub blobs: Arc<Mutex<HashMap<String, (BlobRef, Vec<u8>)>>>,
    pub writes: Arc<AtomicUsize>,
}

impl MockBlobStore {
    pub fn contents(&self, name: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap()
            .get(name)
            .map(|(_, bytes)| String::from_utf8(bytes.clone()).unwrap())
    }
}

impl BlobStore for MockBlobStore {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<BlobRef, AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut blobs = self.blobs.lock().unwrap();
        let (blob, _) = blobs.entry(name.to_string()).or_insert_with(|| {
            (
                BlobRef {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                },
                bytes,
            )
        });
        Ok(blob.clone())
    }

    async fn read(&self, blob: &BlobRef) -> Result<Vec<u8>, AppError> {
        self.blobs
            .lock()
            .unwrap()
            .get(&blob.name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| AppError::Generic(format!("missing blob {}", blob.name)))
    }
}

// =============================================================================
// MockInventory
// =============================================================================

/// Inventory surface that records calls.
///
/// Updates succeed only for values listed in `known_values`. Creates fail for
/// values listed in `rejected_values`.
#[derive(Clone)]
pub struct MockInventory {
    pub category: ResourceCategory,
    pub known_values: Vec<String>,
    pub rejected_values: Vec<String>,
    pub creates: Arc<Mutex<Vec<ResourcePayload>>>,
    pub updates: Arc<Mutex<Vec<(String, String, BTreeMap<String, String>)>>>,
    pub delay: Option<Duration>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
}

impl MockInventory {
    pub fn new(category: ResourceCategory) -> Self {
        Self {
            category,
            known_values: Vec::new(),
            rejected_values: Vec::new(),
            creates: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_known(mut self, values: &[&str]) -> Self {
        self.known_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_rejected(mut self, values: &[&str]) -> Self {
        self.rejected_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.creates.lock().unwrap().len() + self.updates.lock().unwrap().len()
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ResourceInventory for MockInventory {
    async fn create_resource(&self, payload: &ResourcePayload) -> Result<String, AppError> {
        self.enter().await;
        if self.rejected_values.contains(&payload.value) {
            return Err(AppError::ClientError(format!(
                "HTTP 409: duplicate value {}",
                payload.value
            )));
        }
        self.creates.lock().unwrap().push(payload.clone());
        Ok(format!("{}-{}", self.category.surface(), payload.value))
    }

    async fn update_by_key(
        &self,
        resource_type: &str,
        value: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), AppError> {
        self.enter().await;
        self.updates.lock().unwrap().push((
            resource_type.to_string(),
            value.to_string(),
            fields.clone(),
        ));
        if self.known_values.iter().any(|v| v == value) {
            Ok(())
        } else {
            Err(AppError::ResourceNotFound {
                category: self.category.surface().to_string(),
                resource_type: resource_type.to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// Inventory whose calls block until the test releases permits.
#[derive(Clone)]
pub struct GatedInventory {
    pub gate: Arc<Semaphore>,
    pub started: Arc<AtomicUsize>,
}

impl GatedInventory {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn wait_started(&self, n: usize) {
        while self.started.load(Ordering::SeqCst) < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn pass(&self) -> Result<(), AppError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AppError::Generic(e.to_string()))?;
        Ok(())
    }
}

impl ResourceInventory for GatedInventory {
    async fn create_resource(&self, payload: &ResourcePayload) -> Result<String, AppError> {
        self.pass().await?;
        Ok(payload.value.clone())
    }

    async fn update_by_key(
        &self,
        _resource_type: &str,
        _value: &str,
        _fields: &BTreeMap<String, String>,
    ) -> Result<(), AppError> {
        self.pass().await
    }
}

// =============================================================================
// RecordingReporter
// =============================================================================

/// Reporter that keeps a short label for every event.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn has(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }
}

impl BulkReporter for RecordingReporter {
    fn report(&self, event: BulkEvent<'_>) {
        let label = match event {
            BulkEvent::BatchStarted { total, .. } => format!("started:{}", total),
            BulkEvent::ItemSkipped { .. } => "skipped".to_string(),
            BulkEvent::ItemCompleted { status, .. } => format!("item:{}", status),
            BulkEvent::BatchIncomplete { pending, .. } => format!("incomplete:{}", pending),
            BulkEvent::BatchCompleted { counts, .. } => format!("completed:{}", counts.processed),
            BulkEvent::ReportReady { .. } => "report".to_string(),
            BulkEvent::ReportFailed { .. } => "report_failed".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn batch(operation: OperationKind, total: usize) -> Batch {
    Batch {
        id: Uuid::new_v4(),
        operation,
        category: ResourceCategory::Logical,
        item_type: Some("SIM".to_string()),
        file_name: Some("upload.csv".to_string()),
        user_name: Some("ops".to_string()),
        total,
        counts: BatchCounts::default(),
        status: BatchStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        completed_at: None,
    }
}

fn item(batch: &Batch, value: &str, category: ResourceCategory, payload: ItemPayload) -> Item {
    Item {
        id: Uuid::new_v4(),
        batch_id: batch.id,
        value: value.to_string(),
        resource_type: "SIM".to_string(),
        category,
        status: ItemStatus::Pending,
        error_message: None,
        payload,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn create_item(batch: &Batch, msisdn: &str, class: &str, category: ResourceCategory) -> Item {
    item(
        batch,
        msisdn,
        category,
        ItemPayload::Create {
            characteristics: vec![
                Characteristic::new(CHAR_MSISDN, msisdn),
                Characteristic::new(CHAR_MOBILE_CLASS, class),
            ],
        },
    )
}

pub fn update_item(batch: &Batch, value: &str, fields: &[(&str, &str)]) -> Item {
    item(
        batch,
        value,
        ResourceCategory::Logical,
        ItemPayload::Update {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
    )
}

// =============================================================================
// Harness
// =============================================================================

pub type MockProcessor<I> =
    BulkProcessor<I, MockItemStore, MockBatchStore, MockReportStore, MockBlobStore>;

/// All mocks wired into one processor.
pub struct Harness<I: ResourceInventory> {
    pub processor: MockProcessor<I>,
    pub items: MockItemStore,
    pub batches: MockBatchStore,
    pub reports: MockReportStore,
    pub blobs: MockBlobStore,
}

impl<I: ResourceInventory> Harness<I> {
    pub fn new(logical: I, physical: I, items: MockItemStore, config: ProcessorConfig) -> Self {
        let batches = MockBatchStore::default();
        let reports = MockReportStore::default();
        let blobs = MockBlobStore::default();
        let processor = BulkProcessor::with_config(
            logical,
            physical,
            items.clone(),
            batches.clone(),
            reports.clone(),
            blobs.clone(),
            config,
        );
        Self {
            processor,
            items,
            batches,
            reports,
            blobs,
        }
    }
}
