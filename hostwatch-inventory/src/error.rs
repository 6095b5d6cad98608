//! Error types for the inventory store.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors that can occur while persisting or sending inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Disk I/O failed while persisting a snapshot.
    #[error("failed to write snapshot {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Disk I/O failed while reading a snapshot back.
    #[error("failed to read snapshot {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The serialized snapshot is bigger than the configured limit.
    #[error("snapshot for {plugin_id} is {size} bytes, exceeding max inventory size of {max} bytes")]
    TooLarge {
        plugin_id: String,
        size: usize,
        max: usize,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The associated sender failed to deliver inventory.
    #[error("inventory send failed: {0}")]
    Send(String),
}
