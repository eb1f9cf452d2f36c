//! Bulk Client - HTTP client for the resource inventory service
//!
//! The inventory exposes one REST surface per resource category
//! (`logicalresource` and `physicalresource`). [`InventoryClient`] binds to
//! one surface and implements [`bulk_core::traits::ResourceInventory`], so a
//! pair of clients plugs straight into the bulk processor.

pub mod inventory;

pub use inventory::{InventoryClient, InventoryConfig};
