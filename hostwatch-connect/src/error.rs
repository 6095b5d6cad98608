//! Error types for the connectivity check.

use std::time::Duration;
use thiserror::Error;

/// Result type for connectivity operations.
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Errors that can occur while reaching the collector.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Every allowed attempt failed.
    #[error("collector unreachable after {attempts} attempts: {last_error}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        last_error: Box<ConnectError>,
    },

    /// A single attempt did not finish in time.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The probe itself failed (DNS, TLS, refused connection, ...).
    #[error("probe failed: {0}")]
    Probe(String),

    /// The check was cancelled before it could succeed.
    #[error("connectivity check cancelled")]
    Cancelled,
}
