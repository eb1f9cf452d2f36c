//! Integration tests for BulkProcessor runs.

use std::sync::atomic::Ordering;
use std::time::Duration;

use bulk_core::{
    BatchCounts, BatchStatus, ItemStatus, OperationKind, ProcessorConfig, ResourceCategory,
    RetryPolicy, SilentReporter, report_blob_name,
};
use tokio_util::sync::CancellationToken;

use crate::integration::common::{
    Harness, MockInventory, MockItemStore, RecordingReporter, batch, create_item, update_item,
};

fn inventories() -> (MockInventory, MockInventory) {
    (
        MockInventory::new(ResourceCategory::Logical),
        MockInventory::new(ResourceCategory::Physical),
    )
}

#[tokio::test]
async fn test_create_batch_all_succeed() {
    // Arrange
    let b = batch(OperationKind::Create, 3);
    let items = vec![
        create_item(&b, "5511000000001", "Gold", ResourceCategory::Logical),
        create_item(&b, "5511000000002", "Silver", ResourceCategory::Logical),
        create_item(&b, "5511000000003", "Bronze", ResourceCategory::Logical),
    ];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let h = Harness::new(logical.clone(), physical, store, ProcessorConfig::default());

    // Act
    let counts = h
        .processor
        .process(&b, items, CancellationToken::new())
        .await;

    // Assert
    assert_eq!(counts, BatchCounts::new(3, 0));
    assert_eq!(h.items.count(ItemStatus::Success), 3);
    assert_eq!(*h.batches.counts.lock().unwrap(), vec![BatchCounts::new(3, 0)]);
    assert_eq!(
        *h.batches.statuses.lock().unwrap(),
        vec![BatchStatus::Processing, BatchStatus::Completed]
    );

    let creates = logical.creates.lock().unwrap();
    assert_eq!(creates.len(), 3);
    assert!(creates.iter().all(|p| p.base_type == "LogicalResource"));

    let report = h.reports.reports.lock().unwrap().get(&b.id).cloned().unwrap();
    assert_eq!((report.total, report.success, report.failure), (3, 3, 0));

    let csv = h.blobs.contents(&report_blob_name(b.id)).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "MSISDN,MobileClass,Status,ErrorMessage");
    assert_eq!(lines.len(), 4);
    assert!(lines.contains(&"5511000000002,Silver,success,"));
}

#[tokio::test]
async fn test_update_batch_with_unmatched_key() {
    // Arrange
    let b = batch(OperationKind::Update, 2);
    let items = vec![
        update_item(&b, "ROUTER-1", &[("name", "Core Router")]),
        update_item(&b, "ROUTER-404", &[("name", "Ghost")]),
    ];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let logical = logical.with_known(&["ROUTER-1"]);
    let h = Harness::new(logical, physical, store, ProcessorConfig::default());

    // Act
    let counts = h
        .processor
        .process(&b, items.clone(), CancellationToken::new())
        .await;

    // Assert
    assert_eq!(counts, BatchCounts::new(1, 1));

    let failed = h.items.get(items[1].id);
    assert_eq!(failed.status, ItemStatus::Failure);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("no logicalresource found for type=SIM value=ROUTER-404")
    );
    assert_eq!(h.items.get(items[0].id).error_message, None);

    let report = h.reports.reports.lock().unwrap().get(&b.id).cloned().unwrap();
    assert_eq!((report.total, report.success, report.failure), (2, 1, 1));

    let csv = h.blobs.contents(&report_blob_name(b.id)).unwrap();
    assert!(csv.starts_with("Value,Name,Status,ErrorMessage\n"));
    assert!(csv.contains("ROUTER-1,Core Router,success,\n"));
}

#[tokio::test]
async fn test_retry_enabled_batch_writes_each_item_once() {
    // Arrange
    let b = batch(OperationKind::Update, 3);
    let items = vec![
        update_item(&b, "ROUTER-1", &[("name", "Core Router")]),
        update_item(&b, "ROUTER-2", &[("name", "Edge Router")]),
        update_item(&b, "ROUTER-404", &[("name", "Ghost")]),
    ];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let logical = logical.with_known(&["ROUTER-1", "ROUTER-2"]);
    let config = ProcessorConfig::default().with_retry(RetryPolicy::new(3, Duration::ZERO));
    let h = Harness::new(logical.clone(), physical, store, config);

    // Act
    let counts = h
        .processor
        .process(&b, items.clone(), CancellationToken::new())
        .await;

    // Assert
    assert_eq!(counts, BatchCounts::new(2, 1));
    assert_eq!(logical.calls(), 3);
    assert_eq!(h.items.status_writes.load(Ordering::SeqCst), 3);
    assert_eq!(h.items.get(items[2].id).status, ItemStatus::Failure);
    assert_eq!(*h.batches.counts.lock().unwrap(), vec![BatchCounts::new(2, 1)]);
}

#[tokio::test]
async fn test_empty_update_map_succeeds_without_call() {
    let b = batch(OperationKind::Update, 1);
    let items = vec![update_item(&b, "ROUTER-1", &[])];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let h = Harness::new(logical.clone(), physical, store, ProcessorConfig::default());

    let counts = h
        .processor
        .process(&b, items, CancellationToken::new())
        .await;

    assert_eq!(counts, BatchCounts::new(1, 0));
    assert_eq!(logical.calls(), 0);
    assert_eq!(h.items.count(ItemStatus::Success), 1);
}

#[tokio::test]
async fn test_items_route_by_category() {
    let b = batch(OperationKind::Create, 3);
    let items = vec![
        create_item(&b, "1001", "Gold", ResourceCategory::Logical),
        create_item(&b, "2001", "Modem", ResourceCategory::Physical),
        create_item(&b, "2002", "Modem", ResourceCategory::Physical),
    ];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let h = Harness::new(
        logical.clone(),
        physical.clone(),
        store,
        ProcessorConfig::default(),
    );

    h.processor
        .process(&b, items, CancellationToken::new())
        .await;

    assert_eq!(logical.creates.lock().unwrap().len(), 1);
    let physical_creates = physical.creates.lock().unwrap();
    assert_eq!(physical_creates.len(), 2);
    assert!(
        physical_creates
            .iter()
            .all(|p| p.base_type == "PhysicalResource")
    );
}

#[tokio::test]
async fn test_rejected_create_is_recorded_on_item() {
    let b = batch(OperationKind::Create, 2);
    let items = vec![
        create_item(&b, "1001", "Gold", ResourceCategory::Logical),
        create_item(&b, "1002", "Gold", ResourceCategory::Logical),
    ];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let logical = logical.with_rejected(&["1002"]);
    let h = Harness::new(logical, physical, store, ProcessorConfig::default());

    let counts = h
        .processor
        .process(&b, items.clone(), CancellationToken::new())
        .await;

    assert_eq!(counts, BatchCounts::new(1, 1));
    let failed = h.items.get(items[1].id);
    assert!(
        failed
            .error_message
            .unwrap()
            .contains("duplicate value 1002")
    );
    assert_eq!(
        *h.batches.statuses.lock().unwrap().last().unwrap(),
        BatchStatus::Completed
    );
}

#[tokio::test]
async fn test_non_pending_items_are_skipped() {
    let b = batch(OperationKind::Create, 2);
    let mut done = create_item(&b, "1001", "Gold", ResourceCategory::Logical);
    done.status = ItemStatus::Success;
    let fresh = create_item(&b, "1002", "Gold", ResourceCategory::Logical);
    let items = vec![done, fresh];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let h = Harness::new(logical.clone(), physical, store, ProcessorConfig::default());
    let reporter = RecordingReporter::default();

    let counts = h
        .processor
        .process_with_progress(&b, items, CancellationToken::new(), &reporter)
        .await;

    assert_eq!(counts, BatchCounts::new(1, 0));
    assert_eq!(logical.creates.lock().unwrap().len(), 1);
    assert!(reporter.has("skipped"));
    assert!(reporter.has("started:1"));
    assert!(!reporter.labels().iter().any(|l| l.starts_with("incomplete")));
}

#[tokio::test]
async fn test_status_write_failure_still_counts() {
    let b = batch(OperationKind::Create, 2);
    let items = vec![
        create_item(&b, "1001", "Gold", ResourceCategory::Logical),
        create_item(&b, "1002", "Gold", ResourceCategory::Logical),
    ];
    let store = MockItemStore::failing_writes(&items);
    let (logical, physical) = inventories();
    let h = Harness::new(logical, physical, store, ProcessorConfig::default());

    let counts = h
        .processor
        .process(&b, items, CancellationToken::new())
        .await;

    // Known gap: aggregates count the item while its row still reads pending
    assert_eq!(counts, BatchCounts::new(2, 0));
    assert_eq!(h.items.count(ItemStatus::Pending), 2);
    assert_eq!(*h.batches.counts.lock().unwrap(), vec![BatchCounts::new(2, 0)]);
}

#[tokio::test]
async fn test_empty_batch_completes_with_header_only_report() {
    let b = batch(OperationKind::Create, 0);
    let store = MockItemStore::default();
    let (logical, physical) = inventories();
    let h = Harness::new(logical, physical, store, ProcessorConfig::default());

    let counts = h
        .processor
        .process(&b, Vec::new(), CancellationToken::new())
        .await;

    assert_eq!(counts, BatchCounts::default());
    assert_eq!(
        h.blobs.contents(&report_blob_name(b.id)).unwrap(),
        "MSISDN,MobileClass,Status,ErrorMessage\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded_by_workers() {
    let b = batch(OperationKind::Create, 12);
    let items: Vec<_> = (0..12)
        .map(|i| create_item(&b, &format!("55{:04}", i), "Gold", ResourceCategory::Logical))
        .collect();
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let logical = logical.with_delay(Duration::from_millis(50));
    let config = ProcessorConfig::default().with_workers(3);
    let h = Harness::new(logical.clone(), physical, store, config);

    let counts = h
        .processor
        .process_with_progress(&b, items, CancellationToken::new(), &SilentReporter)
        .await;

    assert_eq!(counts, BatchCounts::new(12, 0));
    assert_eq!(
        logical
            .max_in_flight
            .load(std::sync::atomic::Ordering::SeqCst),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_inventory_times_out_item() {
    let b = batch(OperationKind::Create, 1);
    let items = vec![create_item(&b, "1001", "Gold", ResourceCategory::Logical)];
    let store = MockItemStore::with_items(&items);
    let (logical, physical) = inventories();
    let logical = logical.with_delay(Duration::from_secs(30));
    let config = ProcessorConfig::default().with_call_timeout(Duration::from_secs(2));
    let h = Harness::new(logical, physical, store, config);

    let counts = h
        .processor
        .process(&b, items.clone(), CancellationToken::new())
        .await;

    assert_eq!(counts, BatchCounts::new(0, 1));
    assert_eq!(
        h.items.get(items[0].id).error_message.as_deref(),
        Some("Request timed out after 2 seconds")
    );
}
