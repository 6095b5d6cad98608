//! Error types for event delivery.

use thiserror::Error;

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;

/// Errors that can occur when queueing an event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    /// The delivery queue is at capacity.
    #[error("event queue is full")]
    QueueFull,

    /// The consumer of the queue has gone away.
    #[error("event queue is closed")]
    QueueClosed,
}
