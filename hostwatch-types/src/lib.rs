//! Core type definitions for the hostwatch agent runtime.
//!
//! This crate defines the small, plugin-agnostic vocabulary shared by every
//! other crate in the workspace:
//! - Entity keys and plugin identifiers
//! - Identity source kinds used to resolve the host's canonical key
//! - Inventory items, datasets and plugin outputs
//!
//! Anything that knows how to measure, persist or transmit data lives in the
//! crates built on top of this one.

mod ids;
mod identity_source;
mod inventory;

pub use identity_source::IdentitySource;
pub use ids::{EntityKey, PluginId};
pub use inventory::{InventoryItem, PluginInventoryDataset, PluginOutput, SortKey};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid plugin id: {0}")]
    InvalidPluginId(String),

    #[error("unknown identity source: {0}")]
    UnknownIdentitySource(String),
}
