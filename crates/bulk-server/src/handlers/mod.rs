//! HTTP request handlers for API endpoints.

pub mod bulk;
pub mod health;
pub mod report;
