//! Error types for identity resolution.

use thiserror::Error;

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors that can occur while resolving the entity key.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// Every identity source was empty or missing.
    #[error("no identity available: all identity sources are empty")]
    NoIdentityAvailable,
}
