//! Integration tests for ReportFinalizer idempotency.

use std::sync::atomic::Ordering;

use bulk_core::{ItemStatus, OperationKind, ReportFinalizer, ResourceCategory, report_blob_name};

use crate::integration::common::{
    MockBlobStore, MockItemStore, MockReportStore, batch, create_item, update_item,
};

fn finalizer(
    items: &MockItemStore,
) -> (
    ReportFinalizer<MockItemStore, MockReportStore, MockBlobStore>,
    MockReportStore,
    MockBlobStore,
) {
    let reports = MockReportStore::default();
    let blobs = MockBlobStore::default();
    (
        ReportFinalizer::new(items.clone(), reports.clone(), blobs.clone()),
        reports,
        blobs,
    )
}

#[tokio::test]
async fn test_finalize_twice_creates_one_report() {
    // Arrange
    let b = batch(OperationKind::Create, 2);
    let mut items = vec![
        create_item(&b, "1001", "Gold", ResourceCategory::Logical),
        create_item(&b, "1002", "Gold", ResourceCategory::Logical),
    ];
    items[0].status = ItemStatus::Success;
    items[1].status = ItemStatus::Failure;
    items[1].error_message = Some("rejected".to_string());
    let store = MockItemStore::with_items(&items);
    let (finalizer, reports, blobs) = finalizer(&store);

    // Act
    let first = finalizer.finalize(b.id).await.unwrap();
    let second = finalizer.finalize(b.id).await.unwrap();

    // Assert
    assert_eq!(first.id, second.id);
    assert_eq!(second.blob, first.blob);
    assert_eq!((second.total, second.success, second.failure), (2, 1, 1));
    assert_eq!(reports.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.writes.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.blobs.lock().unwrap().len(), 1);
    assert_eq!(first.blob.name, report_blob_name(b.id));
}

#[tokio::test]
async fn test_concurrent_finalize_keeps_single_report_and_blob() {
    let b = batch(OperationKind::Create, 1);
    let items = vec![create_item(&b, "1001", "Gold", ResourceCategory::Logical)];
    let store = MockItemStore::with_items(&items);
    let (finalizer, reports, blobs) = finalizer(&store);

    let (a, c) = tokio::join!(finalizer.finalize(b.id), finalizer.finalize(b.id));
    let (a, c) = (a.unwrap(), c.unwrap());

    assert_eq!(a.id, c.id);
    assert_eq!(reports.reports.lock().unwrap().len(), 1);
    assert_eq!(reports.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(blobs.blobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_lists_every_item_regardless_of_status() {
    let b = batch(OperationKind::Update, 3);
    let mut items = vec![
        update_item(&b, "R1", &[("name", "Edge")]),
        update_item(&b, "R2", &[("name", "Core, Main")]),
        update_item(&b, "R3", &[]),
    ];
    items[0].status = ItemStatus::Success;
    items[1].status = ItemStatus::Failure;
    items[1].error_message = Some("no logicalresource found for type=SIM value=R2".to_string());
    let store = MockItemStore::with_items(&items);
    let (finalizer, _reports, blobs) = finalizer(&store);

    let report = finalizer.finalize(b.id).await.unwrap();

    assert_eq!((report.total, report.success, report.failure), (3, 1, 1));
    let csv = blobs.contents(&report_blob_name(b.id)).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Value,Name,Status,ErrorMessage",
            "R1,Edge,success,",
            "R2,\"Core, Main\",failure,no logicalresource found for type=SIM value=R2",
            "R3,,pending,",
        ]
    );
}

#[tokio::test]
async fn test_download_returns_stored_csv() {
    let b = batch(OperationKind::Create, 1);
    let mut items = vec![create_item(&b, "1001", "Gold", ResourceCategory::Physical)];
    items[0].status = ItemStatus::Success;
    let store = MockItemStore::with_items(&items);
    let (finalizer, _reports, _blobs) = finalizer(&store);

    assert!(finalizer.download(b.id).await.unwrap().is_none());

    finalizer.finalize(b.id).await.unwrap();
    let (report, bytes) = finalizer.download(b.id).await.unwrap().unwrap();

    assert_eq!(report.batch_id, b.id);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "MSISDN,MobileClass,Status,ErrorMessage\n1001,Gold,success,\n"
    );
}

#[tokio::test]
async fn test_counts_come_from_items_not_aggregates() {
    // Items changed after the run are reflected in the first finalization
    let b = batch(OperationKind::Create, 2);
    let mut items = vec![
        create_item(&b, "1001", "Gold", ResourceCategory::Logical),
        create_item(&b, "1002", "Gold", ResourceCategory::Logical),
    ];
    items[0].status = ItemStatus::Success;
    let store = MockItemStore::with_items(&items);
    let (finalizer, _reports, _blobs) = finalizer(&store);

    let report = finalizer.finalize(b.id).await.unwrap();

    assert_eq!((report.total, report.success, report.failure), (2, 1, 0));
}
