use thiserror::Error;

/// Application-wide error types.
///
/// Every fallible operation in the bulk engine returns this error. Library
/// errors convert automatically through `#[from]`:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```
/// use bulk_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// assert!(example().is_err());
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps connection failures, query errors and constraint violations
    /// raised by the store implementations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// The inventory service answered with an unexpected status or body.
    #[error("Inventory client error: {0}")]
    ClientError(String),

    /// Network or connection error reaching the inventory service.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// An outbound call exceeded its deadline.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No resource matched the lookup key on the given inventory surface.
    #[error("no {category} found for type={resource_type} value={value}")]
    ResourceNotFound {
        category: String,
        resource_type: String,
        value: String,
    },

    /// The requested batch does not exist.
    #[error("Batch not found: {0}")]
    BatchNotFound(String),

    /// The item cannot be applied as submitted (missing key, wrong payload shape).
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// A status change that the lifecycle does not allow.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for API and log output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::NetworkError(msg) => {
                format!(
                    "Cannot reach the inventory service: {}\n   Check INVENTORY_URL and network access.",
                    msg
                )
            }
            AppError::Timeout(secs) => {
                format!(
                    "Inventory call timed out after {} seconds.\n   The service may be overloaded.",
                    secs
                )
            }
            AppError::ConfigError(msg) => {
                format!("Configuration error: {}\n   Check your environment.", msg)
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if a repeated attempt could succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulk_core::error::AppError;
    ///
    /// assert!(AppError::Timeout(10).is_retryable());
    ///
    /// let err = AppError::ResourceNotFound {
    ///     category: "logicalresource".to_string(),
    ///     resource_type: "SIM".to_string(),
    ///     value: "123".to_string(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::ClientError(_)
        )
    }

    /// Returns true for the not-found class of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::ResourceNotFound { .. } | AppError::BatchNotFound(_)
        )
    }
}
