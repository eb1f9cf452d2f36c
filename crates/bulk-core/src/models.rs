//! Domain models for bulk batches, items and reports.
//!
//! # Lifecycle
//!
//! ```text
//! Item:   pending → success
//!             ↘ failure
//!
//! Batch:  pending → processing → completed
//!             ↘───────────────↗
//! ```
//!
//! Intake creates batches and items in `pending`. The engine only moves
//! statuses forward, writes counts and creates the report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Characteristic code carrying the item's lookup value on create payloads.
pub const CHAR_MSISDN: &str = "MSISDN";

/// Characteristic code carrying the descriptive name on create payloads.
pub const CHAR_MOBILE_CLASS: &str = "MobileClass";

/// Update field rendered in the `Name` column of update-shape reports.
pub const UPDATE_FIELD_NAME: &str = "name";

// =============================================================================
// Parse Error
// =============================================================================

/// Error type for parsing the closed enums of this module from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

// =============================================================================
// Operation Kind & Resource Category
// =============================================================================

/// The intent carried by every item of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            _ => Err(ParseEnumError::new("operation kind", s)),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which inventory surface a resource lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceCategory {
    #[serde(rename = "LogicalResource", alias = "logical")]
    Logical,
    #[serde(rename = "PhysicalResource", alias = "physical")]
    Physical,
}

impl ResourceCategory {
    /// Base type name as stored and sent to the inventory service.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::Logical => "LogicalResource",
            ResourceCategory::Physical => "PhysicalResource",
        }
    }

    /// Collection name of the inventory surface, used in error messages
    /// and as the client path segment.
    pub fn surface(&self) -> &'static str {
        match self {
            ResourceCategory::Logical => "logicalresource",
            ResourceCategory::Physical => "physicalresource",
        }
    }
}

impl std::str::FromStr for ResourceCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LogicalResource" | "logical" => Ok(ResourceCategory::Logical),
            "PhysicalResource" | "physical" => Ok(ResourceCategory::Physical),
            _ => Err(ParseEnumError::new("resource category", s)),
        }
    }
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Item Status
// =============================================================================

/// Per-item processing status. `Success` and `Failure` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Success,
    Failure,
}

impl ItemStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Success => "success",
            ItemStatus::Failure => "failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Success | ItemStatus::Failure)
    }

    /// Validates a status change. Only `pending → success|failure` is allowed.
    pub fn transition_to(self, next: ItemStatus) -> Result<ItemStatus, AppError> {
        match (self, next) {
            (ItemStatus::Pending, ItemStatus::Success | ItemStatus::Failure) => Ok(next),
            _ => Err(AppError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "success" => Ok(ItemStatus::Success),
            "failure" => Ok(ItemStatus::Failure),
            _ => Err(ParseEnumError::new("item status", s)),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Batch Status
// =============================================================================

/// Batch status. `Completed` is terminal and is reached whatever the item
/// outcomes were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
}

impl BatchStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed)
    }

    /// Validates a status change along `pending → processing → completed`.
    pub fn transition_to(self, next: BatchStatus) -> Result<BatchStatus, AppError> {
        match (self, next) {
            (BatchStatus::Pending, BatchStatus::Processing)
            | (BatchStatus::Pending, BatchStatus::Completed)
            | (BatchStatus::Processing, BatchStatus::Completed) => Ok(next),
            _ => Err(AppError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            }),
        }
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            _ => Err(ParseEnumError::new("batch status", s)),
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Item
// =============================================================================

/// A named attribute attached to a create-intent item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristic {
    pub code: String,
    pub name: String,
    pub value: String,
}

impl Characteristic {
    pub fn new(code: impl Into<String>, value: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            name: code.clone(),
            code,
            value: value.into(),
        }
    }
}

/// The intent payload of an item. Exactly one shape is active and it must
/// match the owning batch's [`OperationKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ItemPayload {
    Create {
        characteristics: Vec<Characteristic>,
    },
    Update {
        fields: BTreeMap<String, String>,
    },
}

impl ItemPayload {
    pub fn operation(&self) -> OperationKind {
        match self {
            ItemPayload::Create { .. } => OperationKind::Create,
            ItemPayload::Update { .. } => OperationKind::Update,
        }
    }

    /// Value of the characteristic with the given code, if this is a create payload.
    pub fn characteristic(&self, code: &str) -> Option<&str> {
        match self {
            ItemPayload::Create { characteristics } => characteristics
                .iter()
                .find(|c| c.code == code)
                .map(|c| c.value.as_str()),
            ItemPayload::Update { .. } => None,
        }
    }

    /// Update field map, if this is an update payload.
    pub fn update_fields(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ItemPayload::Update { fields } => Some(fields),
            ItemPayload::Create { .. } => None,
        }
    }

    /// True for an update payload carrying at least one field.
    pub fn has_update_fields(&self) -> bool {
        self.update_fields().is_some_and(|f| !f.is_empty())
    }
}

/// One record-level intent belonging to exactly one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub batch_id: Uuid,
    /// Lookup value (MSISDN, serial number, ...).
    pub value: String,
    pub resource_type: String,
    pub category: ResourceCategory,
    pub status: ItemStatus,
    pub error_message: Option<String>,
    pub payload: ItemPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item data submitted at intake, before identities are assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub value: String,
    pub resource_type: String,
    pub category: ResourceCategory,
    pub payload: ItemPayload,
}

// =============================================================================
// Batch
// =============================================================================

/// Aggregate outcome counts of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub processed: usize,
    pub success: usize,
    pub failure: usize,
}

impl BatchCounts {
    pub fn new(success: usize, failure: usize) -> Self {
        Self {
            processed: success + failure,
            success,
            failure,
        }
    }
}

/// One logical bulk operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub operation: OperationKind,
    pub category: ResourceCategory,
    /// Declared item type. Items fall back to their own type when absent.
    pub item_type: Option<String>,
    pub file_name: Option<String>,
    pub user_name: Option<String>,
    pub total: usize,
    pub counts: BatchCounts,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// Type used for an item: the batch-declared one, or the item's own type
    /// when the batch declares none.
    pub fn effective_type<'a>(&'a self, item: &'a Item) -> &'a str {
        match self.item_type.as_deref() {
            Some(declared) if !declared.is_empty() => declared,
            _ => &item.resource_type,
        }
    }

    /// Completed while some items were never dispatched.
    pub fn is_incomplete(&self) -> bool {
        self.status.is_terminal() && self.counts.processed < self.total
    }

    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return if self.status.is_terminal() { 100 } else { 0 };
        }
        let pct = self.counts.processed.min(self.total) * 100 / self.total;
        pct as u8
    }
}

/// Batch data submitted at intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub operation: OperationKind,
    pub category: ResourceCategory,
    pub item_type: Option<String>,
    pub file_name: Option<String>,
    pub user_name: Option<String>,
}

// =============================================================================
// Report
// =============================================================================

/// Reference to a stored report blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub id: Uuid,
    pub name: String,
}

/// Completion report of a batch. At most one exists per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub blob: BlobRef,
    pub created_at: DateTime<Utc>,
}

/// Report data handed to [`crate::traits::ReportStore::create_if_absent`].
#[derive(Debug, Clone)]
pub struct NewReport {
    pub batch_id: Uuid,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub blob: BlobRef,
}

/// Payload sent to the inventory service to create one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePayload {
    pub description: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(rename = "@baseType")]
    pub base_type: String,
    pub value: String,
    pub resource_characteristic: Vec<Characteristic>,
}
