//! REST client for one inventory surface.
//!
//! # Examples
//!
//! ```no_run
//! use bulk_client::{InventoryClient, InventoryConfig};
//!
//! # fn example() -> Result<(), bulk_core::AppError> {
//! let (logical, physical) =
//!     InventoryClient::pair("http://inventory:8080/api/", InventoryConfig::default())?;
//! assert_eq!(logical.endpoint().path(), "/api/logicalresource");
//! # let _ = physical;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use bulk_core::error::AppError;
use bulk_core::models::{ResourceCategory, ResourcePayload};
use bulk_core::traits::ResourceInventory;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

/// HTTP settings for the inventory client.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    /// Transport timeout for every request.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("bulk-server/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Body returned by the inventory on create.
#[derive(Deserialize, Debug)]
struct CreatedResource {
    id: String,
}

/// HTTP client bound to a single inventory surface.
#[derive(Clone)]
pub struct InventoryClient {
    client: Client,
    endpoint: Url,
    category: ResourceCategory,
    timeout: Duration,
}

impl InventoryClient {
    /// Creates a client for `category` under the inventory base URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the URL is invalid.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        category: ResourceCategory,
        config: InventoryConfig,
    ) -> Result<Self, AppError> {
        // A base without trailing slash would lose its last segment on join
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let endpoint = Url::parse(&normalized)
            .and_then(|base| base.join(category.surface()))
            .map_err(|e| AppError::ConfigError(format!("invalid inventory URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            category,
            timeout: config.timeout,
        })
    }

    /// Builds the logical and physical clients over one base URL.
    pub fn pair(base_url: &str, config: InventoryConfig) -> Result<(Self, Self), AppError> {
        Ok((
            Self::new(base_url, ResourceCategory::Logical, config.clone())?,
            Self::new(base_url, ResourceCategory::Physical, config)?,
        ))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.timeout.as_secs())
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::ClientError(e.to_string())
        }
    }

    /// Maps a non-success response to an error.
    ///
    /// 5xx stays retryable as `ClientError`; other 4xx mean the item itself
    /// was rejected.
    async fn status_error(&self, resp: reqwest::Response) -> AppError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let detail = if body.trim().is_empty() {
            format!("HTTP {} from {}", status.as_u16(), self.endpoint)
        } else {
            format!("HTTP {}: {}", status.as_u16(), body.trim())
        };

        if status.is_server_error() {
            AppError::ClientError(detail)
        } else {
            AppError::InvalidItem(detail)
        }
    }
}

impl ResourceInventory for InventoryClient {
    async fn create_resource(&self, payload: &ResourcePayload) -> Result<String, AppError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            return Err(self.status_error(resp).await);
        }

        let created: CreatedResource = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(format!("unexpected create response: {}", e)))?;

        tracing::debug!(
            surface = self.category.surface(),
            id = %created.id,
            value = %payload.value,
            "Resource created"
        );
        Ok(created.id)
    }

    async fn update_by_key(
        &self,
        resource_type: &str,
        value: &str,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), AppError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("type", resource_type)
            .append_pair("value", value);

        let resp = self
            .client
            .patch(url)
            .json(fields)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match resp.status() {
            s if s.is_success() => {
                tracing::debug!(
                    surface = self.category.surface(),
                    resource_type,
                    value,
                    "Resource updated"
                );
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(AppError::ResourceNotFound {
                category: self.category.surface().to_string(),
                resource_type: resource_type.to_string(),
                value: value.to_string(),
            }),
            _ => Err(self.status_error(resp).await),
        }
    }
}
