use std::time::Duration;

use clap::Parser;

use bulk_client::InventoryConfig;
use bulk_core::{ProcessorConfig, RetryPolicy};

/// Server configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "bulk-server")]
#[command(author, version, about = "REST API server for bulk resource processing")]
pub struct ServerConfig {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Base URL of the resource inventory service
    #[arg(long, env = "INVENTORY_URL")]
    pub inventory_url: String,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Maximum number of items applied concurrently per batch
    #[arg(long, env = "BULK_WORKERS", default_value = "10")]
    pub workers: usize,

    /// Per-call deadline for inventory requests, in seconds
    #[arg(long, env = "BULK_CALL_TIMEOUT_SECS", default_value = "10")]
    pub call_timeout_secs: u64,

    /// Attempts per item for retryable inventory errors (1 disables retry)
    #[arg(long, env = "BULK_MAX_ATTEMPTS", default_value = "1")]
    pub max_attempts: u32,

    /// Maximum PostgreSQL pool connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "10")]
    pub db_max_connections: u32,

    /// Allowed CORS origins, comma separated, or "*"
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,
}

impl ServerConfig {
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig::default()
            .with_workers(self.workers)
            .with_call_timeout(Duration::from_secs(self.call_timeout_secs))
            .with_retry(RetryPolicy::new(
                self.max_attempts,
                RetryPolicy::default().backoff,
            ))
    }

    pub fn inventory_config(&self) -> InventoryConfig {
        InventoryConfig {
            timeout: Duration::from_secs(self.call_timeout_secs),
            ..InventoryConfig::default()
        }
    }
}
