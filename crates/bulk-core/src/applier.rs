//! Item applier: turns one item into one inventory call.
//!
//! The behaviour is picked from the batch operation and the item's
//! category, giving four strategies:
//!
//! | operation | logical          | physical          |
//! |-----------|------------------|-------------------|
//! | create    | `CreateLogical`  | `CreatePhysical`  |
//! | update    | `UpdateLogical`  | `UpdatePhysical`  |
//!
//! Every outbound call is bounded by the configured timeout. Retryable
//! failures are re-attempted according to the [`RetryPolicy`].

use std::time::Duration;

use tracing::warn;

use crate::config::{ProcessorConfig, RetryPolicy};
use crate::error::AppError;
use crate::models::{
    Batch, CHAR_MOBILE_CLASS, CHAR_MSISDN, Characteristic, Item, ItemPayload, OperationKind,
    ResourceCategory, ResourcePayload,
};
use crate::traits::ResourceInventory;

/// How an item is applied against the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStrategy {
    CreateLogical,
    CreatePhysical,
    UpdateLogical,
    UpdatePhysical,
}

impl ApplyStrategy {
    pub fn select(operation: OperationKind, category: ResourceCategory) -> Self {
        match (operation, category) {
            (OperationKind::Create, ResourceCategory::Logical) => ApplyStrategy::CreateLogical,
            (OperationKind::Create, ResourceCategory::Physical) => ApplyStrategy::CreatePhysical,
            (OperationKind::Update, ResourceCategory::Logical) => ApplyStrategy::UpdateLogical,
            (OperationKind::Update, ResourceCategory::Physical) => ApplyStrategy::UpdatePhysical,
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            ApplyStrategy::CreateLogical | ApplyStrategy::CreatePhysical => OperationKind::Create,
            ApplyStrategy::UpdateLogical | ApplyStrategy::UpdatePhysical => OperationKind::Update,
        }
    }

    pub fn category(&self) -> ResourceCategory {
        match self {
            ApplyStrategy::CreateLogical | ApplyStrategy::UpdateLogical => {
                ResourceCategory::Logical
            }
            ApplyStrategy::CreatePhysical | ApplyStrategy::UpdatePhysical => {
                ResourceCategory::Physical
            }
        }
    }
}

/// Builds the inventory create payload for a create-intent item.
///
/// The lookup value comes from the `MSISDN` characteristic, falling back to
/// the item value; the name comes from `MobileClass`.
pub fn build_create_payload(batch: &Batch, item: &Item) -> Result<ResourcePayload, AppError> {
    let msisdn = item
        .payload
        .characteristic(CHAR_MSISDN)
        .filter(|v| !v.is_empty())
        .unwrap_or(item.value.as_str());
    if msisdn.is_empty() {
        return Err(AppError::InvalidItem(format!(
            "item {} has no {} value",
            item.id, CHAR_MSISDN
        )));
    }
    let mobile_class = item
        .payload
        .characteristic(CHAR_MOBILE_CLASS)
        .unwrap_or_default();
    let resource_type = batch.effective_type(item);

    Ok(ResourcePayload {
        description: resource_type.to_string(),
        name: mobile_class.to_string(),
        resource_type: resource_type.to_string(),
        base_type: item.category.as_str().to_string(),
        value: msisdn.to_string(),
        resource_characteristic: vec![
            Characteristic::new(CHAR_MSISDN, msisdn),
            Characteristic::new(CHAR_MOBILE_CLASS, mobile_class),
        ],
    })
}

/// Applies items against the logical and physical inventory surfaces.
pub struct ItemApplier<I>
where
    I: ResourceInventory,
{
    logical: I,
    physical: I,
    call_timeout: Duration,
    retry: RetryPolicy,
}

impl<I> Clone for ItemApplier<I>
where
    I: ResourceInventory,
{
    fn clone(&self) -> Self {
        Self {
            logical: self.logical.clone(),
            physical: self.physical.clone(),
            call_timeout: self.call_timeout,
            retry: self.retry.clone(),
        }
    }
}

impl<I> ItemApplier<I>
where
    I: ResourceInventory,
{
    /// Creates an applier with the default timeout and no retries.
    pub fn new(logical: I, physical: I) -> Self {
        Self::with_config(logical, physical, &ProcessorConfig::default())
    }

    pub fn with_config(logical: I, physical: I, config: &ProcessorConfig) -> Self {
        Self {
            logical,
            physical,
            call_timeout: config.call_timeout,
            retry: config.retry.clone(),
        }
    }

    fn surface(&self, category: ResourceCategory) -> &I {
        match category {
            ResourceCategory::Logical => &self.logical,
            ResourceCategory::Physical => &self.physical,
        }
    }

    /// Applies one item. The error, if any, is the item's failure reason.
    pub async fn apply(&self, batch: &Batch, item: &Item) -> Result<(), AppError> {
        let strategy = ApplyStrategy::select(batch.operation, item.category);
        if item.payload.operation() != strategy.operation() {
            return Err(AppError::InvalidItem(format!(
                "{} payload in a {} batch",
                item.payload.operation(),
                batch.operation
            )));
        }

        let mut attempt = 1;
        loop {
            match self.apply_once(strategy, batch, item).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    attempt += 1;
                    warn!(
                        item_id = %item.id,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Inventory call failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn apply_once(
        &self,
        strategy: ApplyStrategy,
        batch: &Batch,
        item: &Item,
    ) -> Result<(), AppError> {
        let inventory = self.surface(strategy.category());

        match (strategy.operation(), &item.payload) {
            (OperationKind::Create, ItemPayload::Create { .. }) => {
                let payload = build_create_payload(batch, item)?;
                self.bounded(inventory.create_resource(&payload)).await?;
                Ok(())
            }
            (OperationKind::Update, ItemPayload::Update { fields }) => {
                if fields.is_empty() {
                    return Ok(());
                }
                let resource_type = batch.effective_type(item);
                if resource_type.is_empty() || item.value.is_empty() {
                    return Err(AppError::InvalidItem(
                        "resourceType and value are required".to_string(),
                    ));
                }
                self.bounded(inventory.update_by_key(resource_type, &item.value, fields))
                    .await
            }
            _ => Err(AppError::InvalidItem(format!(
                "payload does not match operation {}",
                strategy.operation()
            ))),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(self.call_timeout.as_secs())),
        }
    }
}
