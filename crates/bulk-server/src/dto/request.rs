//! Request DTOs for API endpoints.

use std::collections::BTreeMap;

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use bulk_core::{
    BatchStatus, CHAR_MSISDN, Characteristic, ItemPayload, ItemStatus, NewBatch, NewItem,
    OperationKind, ResourceCategory,
};

use crate::error::ApiError;

/// Maximum number of items accepted in one batch.
pub const MAX_BATCH_ITEMS: usize = 50_000;

/// Default and maximum page size for batch listings.
pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;

/// Request body for submitting a bulk batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBulkRequest {
    /// Intent applied to every item: create or update
    #[schema(value_type = String, example = "create")]
    pub operation: OperationKind,

    /// Default inventory category for items that do not declare one
    #[schema(value_type = String, example = "LogicalResource")]
    pub category: ResourceCategory,

    /// Default resource type for items that do not declare one
    #[schema(example = "SIM")]
    pub item_type: Option<String>,

    /// Name of the uploaded file the items came from
    pub file_name: Option<String>,

    /// User who submitted the batch
    pub user_name: Option<String>,

    pub items: Vec<BulkItemRequest>,
}

/// One characteristic of a create item.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CharacteristicRequest {
    #[schema(example = "MSISDN")]
    pub code: String,
    #[schema(example = "5511999990000")]
    pub value: String,
}

/// One item of a bulk batch.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkItemRequest {
    /// Lookup value of the resource
    #[schema(example = "5511999990000")]
    pub value: String,

    /// Resource type, used when the batch declares no item type
    #[serde(rename = "type")]
    pub resource_type: Option<String>,

    /// Inventory category, overriding the batch category
    #[schema(value_type = Option<String>)]
    pub category: Option<ResourceCategory>,

    /// Characteristics for create batches
    pub characteristics: Option<Vec<CharacteristicRequest>>,

    /// Fields to set for update batches
    pub update_fields: Option<BTreeMap<String, String>>,
}

impl CreateBulkRequest {
    /// Validates the request and splits it into intake records.
    pub fn into_intake(self) -> Result<(NewBatch, Vec<NewItem>), ApiError> {
        let Self {
            operation,
            category,
            item_type,
            file_name,
            user_name,
            items,
        } = self;

        if items.is_empty() {
            return Err(ApiError::BadRequest("items must not be empty".to_string()));
        }
        if items.len() > MAX_BATCH_ITEMS {
            return Err(ApiError::BadRequest(format!(
                "too many items: {} (max: {})",
                items.len(),
                MAX_BATCH_ITEMS
            )));
        }

        let item_type = item_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                item.into_new_item(index, operation, category, item_type.as_deref())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch = NewBatch {
            operation,
            category,
            item_type,
            file_name,
            user_name,
        };

        Ok((batch, items))
    }
}

impl BulkItemRequest {
    fn into_new_item(
        self,
        index: usize,
        operation: OperationKind,
        default_category: ResourceCategory,
        default_type: Option<&str>,
    ) -> Result<NewItem, ApiError> {
        let invalid = |msg: &str| ApiError::BadRequest(format!("item {}: {}", index, msg));

        let value = self.value.trim().to_string();
        if value.is_empty() {
            return Err(invalid("value is required"));
        }

        let resource_type = default_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.resource_type
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .ok_or_else(|| invalid("type is required when the batch has no item_type"))?;

        let payload = match operation {
            OperationKind::Create => {
                if self.update_fields.is_some() {
                    return Err(invalid("update_fields is not allowed in a create batch"));
                }
                let mut characteristics: Vec<Characteristic> = self
                    .characteristics
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| Characteristic::new(c.code, c.value))
                    .collect();
                if !characteristics.iter().any(|c| c.code == CHAR_MSISDN) {
                    characteristics.push(Characteristic::new(CHAR_MSISDN, value.as_str()));
                }
                ItemPayload::Create { characteristics }
            }
            OperationKind::Update => {
                if self.characteristics.is_some() {
                    return Err(invalid("characteristics are not allowed in an update batch"));
                }
                ItemPayload::Update {
                    fields: self.update_fields.unwrap_or_default(),
                }
            }
        };

        Ok(NewItem {
            value,
            resource_type,
            category: self.category.unwrap_or(default_category),
            payload,
        })
    }
}

/// Query parameters for listing batches.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListBatchesQuery {
    /// Filter by batch status: pending, processing or completed
    #[param(example = "completed")]
    pub status: Option<String>,

    /// Maximum number of batches (default: 20, max: 100)
    #[param(example = 20)]
    pub limit: Option<usize>,
}

impl ListBatchesQuery {
    pub fn status(&self) -> Result<Option<BatchStatus>, ApiError> {
        self.status
            .as_deref()
            .map(|s| s.parse().map_err(|e: bulk_core::ParseEnumError| ApiError::BadRequest(e.to_string())))
            .transpose()
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Query parameters for listing the items of a batch.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListItemsQuery {
    /// Filter by item status: pending, success or failure
    #[param(example = "failure")]
    pub status: Option<String>,
}

impl ListItemsQuery {
    pub fn status(&self) -> Result<Option<ItemStatus>, ApiError> {
        self.status
            .as_deref()
            .map(|s| s.parse().map_err(|e: bulk_core::ParseEnumError| ApiError::BadRequest(e.to_string())))
            .transpose()
    }
}
