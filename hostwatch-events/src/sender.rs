//! Hand-off of accepted events to the delivery side.

use crate::error::{EventError, EventResult};
use crate::event::SampleEvent;
use hostwatch_types::EntityKey;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Accepts events for asynchronous delivery. Must not block.
pub trait EventSender: Send + Sync {
    fn queue_event(&self, event: SampleEvent, entity_key: &EntityKey) -> EventResult<()>;
}

/// An event waiting for delivery, tagged with the entity it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub entity_key: EntityKey,
    pub event: SampleEvent,
}

/// [`EventSender`] backed by a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSender {
    tx: mpsc::Sender<QueuedEvent>,
}

impl ChannelEventSender {
    /// Creates a sender and the receiver the delivery task drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<QueuedEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl EventSender for ChannelEventSender {
    fn queue_event(&self, event: SampleEvent, entity_key: &EntityKey) -> EventResult<()> {
        self.tx
            .try_send(QueuedEvent {
                entity_key: entity_key.clone(),
                event,
            })
            .map_err(|e| match e {
                TrySendError::Full(_) => EventError::QueueFull,
                TrySendError::Closed(_) => EventError::QueueClosed,
            })
    }
}
