//! Report finalizer: idempotent CSV report per batch.
//!
//! # Flow
//!
//! ```text
//! find_by_batch ──found──▶ return existing
//!      │
//!    absent
//!      ▼
//! list_by_batch → pick shape → render CSV → blob write → create_if_absent
//! ```
//!
//! The blob is named `bulk_report_<batch_id>.csv` and blob writes are
//! idempotent by name, so concurrent finalizations of one batch end with a
//! single blob and a single report row.

use std::io::Write;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    CHAR_MOBILE_CLASS, CHAR_MSISDN, Item, ItemStatus, NewReport, Report, UPDATE_FIELD_NAME,
};
use crate::traits::{BlobStore, ItemStore, ReportStore};

/// Column layout of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    /// `MSISDN,MobileClass,Status,ErrorMessage`
    Create,
    /// `Value,Name,Status,ErrorMessage`
    Update,
}

impl ReportShape {
    /// Update shape when any item carries a non-empty update field map.
    pub fn detect(items: &[Item]) -> Self {
        if items.iter().any(|i| i.payload.has_update_fields()) {
            ReportShape::Update
        } else {
            ReportShape::Create
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            ReportShape::Create => "MSISDN,MobileClass,Status,ErrorMessage",
            ReportShape::Update => "Value,Name,Status,ErrorMessage",
        }
    }
}

/// Blob name of a batch's report.
pub fn report_blob_name(batch_id: Uuid) -> String {
    format!("bulk_report_{}.csv", batch_id)
}

/// Renders the CSV report of `items` in the given shape, one row per item.
pub fn render_csv(items: &[Item], shape: ReportShape) -> Result<Vec<u8>, AppError> {
    let mut out = Vec::with_capacity(64 * (items.len() + 1));
    writeln!(out, "{}", shape.header()).map_err(|e| AppError::Generic(e.to_string()))?;

    for item in items {
        let (key, name) = match shape {
            ReportShape::Create => (
                item.payload.characteristic(CHAR_MSISDN).unwrap_or_default(),
                item.payload
                    .characteristic(CHAR_MOBILE_CLASS)
                    .unwrap_or_default(),
            ),
            ReportShape::Update => (
                item.value.as_str(),
                item.payload
                    .update_fields()
                    .and_then(|f| f.get(UPDATE_FIELD_NAME))
                    .map(String::as_str)
                    .unwrap_or_default(),
            ),
        };
        writeln!(
            out,
            "{},{},{},{}",
            escape_csv(key),
            escape_csv(name),
            item.status.as_str(),
            escape_csv(item.error_message.as_deref().unwrap_or_default()),
        )
        .map_err(|e| AppError::Generic(e.to_string()))?;
    }

    Ok(out)
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Materializes the completion report of a batch, at most once.
pub struct ReportFinalizer<IS, RS, BL>
where
    IS: ItemStore,
    RS: ReportStore,
    BL: BlobStore,
{
    items: IS,
    reports: RS,
    blobs: BL,
}

impl<IS, RS, BL> Clone for ReportFinalizer<IS, RS, BL>
where
    IS: ItemStore,
    RS: ReportStore,
    BL: BlobStore,
{
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            reports: self.reports.clone(),
            blobs: self.blobs.clone(),
        }
    }
}

impl<IS, RS, BL> ReportFinalizer<IS, RS, BL>
where
    IS: ItemStore,
    RS: ReportStore,
    BL: BlobStore,
{
    pub fn new(items: IS, reports: RS, blobs: BL) -> Self {
        Self {
            items,
            reports,
            blobs,
        }
    }

    /// Returns the batch's report, creating it on the first call.
    ///
    /// Counts are computed from the items as listed now, not from the
    /// batch aggregates.
    pub async fn finalize(&self, batch_id: Uuid) -> Result<Report, AppError> {
        if let Some(existing) = self.reports.find_by_batch(batch_id).await? {
            debug!(%batch_id, report_id = %existing.id, "Report already exists");
            return Ok(existing);
        }

        let items = self.items.list_by_batch(batch_id).await?;
        let shape = ReportShape::detect(&items);
        let csv = render_csv(&items, shape)?;

        let blob = self.blobs.write(&report_blob_name(batch_id), csv).await?;

        let success = items
            .iter()
            .filter(|i| i.status == ItemStatus::Success)
            .count();
        let failure = items
            .iter()
            .filter(|i| i.status == ItemStatus::Failure)
            .count();

        let report = self
            .reports
            .create_if_absent(NewReport {
                batch_id,
                total: items.len(),
                success,
                failure,
                blob,
            })
            .await?;

        info!(
            %batch_id,
            report_id = %report.id,
            total = report.total,
            success = report.success,
            failure = report.failure,
            "Report finalized"
        );
        Ok(report)
    }

    /// Reads the CSV bytes of a finalized report.
    pub async fn download(&self, batch_id: Uuid) -> Result<Option<(Report, Vec<u8>)>, AppError> {
        let Some(report) = self.reports.find_by_batch(batch_id).await? else {
            return Ok(None);
        };
        let bytes = self.blobs.read(&report.blob).await?;
        Ok(Some((report, bytes)))
    }
}
