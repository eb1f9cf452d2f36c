//! Bulk Server - REST API for bulk resource processing
//!
//! This crate provides an HTTP API over the bulk engine:
//!
//! - **Bulk**: Submit batches and follow their progress
//! - **Reports**: Fetch, download and re-finalize completion reports
//!
//! # API Documentation
//!
//! The OpenAPI document is served at `/api-docs/openapi.json`.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
