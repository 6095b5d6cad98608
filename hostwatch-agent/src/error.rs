//! Error types for the agent.

use hostwatch_connect::ConnectError;
use hostwatch_events::EventError;
use hostwatch_identity::IdentityError;
use hostwatch_inventory::InventoryError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while configuring or running the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("connectivity error: {0}")]
    Connect(#[from] ConnectError),

    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// The plugin output channel has no receiver any more.
    #[error("plugin output channel closed")]
    ChannelClosed,

    /// `run` was called on an agent whose loop already started.
    #[error("agent is already running")]
    AlreadyRunning,
}
