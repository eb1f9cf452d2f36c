//! Test utilities for integration tests.
//!
//! Provides helper functions to set up isolated PostgreSQL containers and
//! sample intake data.

use std::collections::BTreeMap;

use bulk_core::{
    CHAR_MOBILE_CLASS, CHAR_MSISDN, Characteristic, ItemPayload, NewBatch, NewItem,
    OperationKind, ResourceCategory,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Sets up a PostgreSQL container with the bulk schema applied.
///
/// The container is removed when the returned `ContainerAsync` is dropped,
/// so keep it alive for the test duration.
pub async fn setup_test_db() -> (PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16-alpine")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "postgres")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    // The server restarts once after init, so retry until it accepts connections
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_RETRIES, e
                    );
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    bulk_db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    (pool, container)
}

pub fn new_batch(operation: OperationKind) -> NewBatch {
    NewBatch {
        operation,
        category: ResourceCategory::Logical,
        item_type: Some("SIM".to_string()),
        file_name: Some("upload.csv".to_string()),
        user_name: Some("ops".to_string()),
    }
}

pub fn new_create_item(msisdn: &str) -> NewItem {
    NewItem {
        value: msisdn.to_string(),
        resource_type: "SIM".to_string(),
        category: ResourceCategory::Logical,
        payload: ItemPayload::Create {
            characteristics: vec![
                Characteristic::new(CHAR_MSISDN, msisdn),
                Characteristic::new(CHAR_MOBILE_CLASS, "Gold"),
            ],
        },
    }
}

pub fn new_update_item(value: &str, name: &str) -> NewItem {
    NewItem {
        value: value.to_string(),
        resource_type: "Router".to_string(),
        category: ResourceCategory::Logical,
        payload: ItemPayload::Update {
            fields: BTreeMap::from([("name".to_string(), name.to_string())]),
        },
    }
}
