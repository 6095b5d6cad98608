//! Delivery of persisted inventory to the backend.
//!
//! The delta computation and wire protocol live outside this crate; each
//! registered entity simply owns a sender that knows how to ship whatever
//! changed since its last run.

use crate::error::InventoryResult;
use async_trait::async_trait;
use hostwatch_types::EntityKey;
use std::sync::Arc;

/// Ships pending inventory changes for one entity.
#[async_trait]
pub trait InventorySender: Send + Sync {
    /// Sends whatever is pending. Called once per send interval.
    async fn process(&self) -> InventoryResult<()>;
}

/// Builds the sender for a newly registered entity.
pub type SenderFactory = Arc<dyn Fn(&EntityKey) -> Arc<dyn InventorySender> + Send + Sync>;

/// A sender that drops everything. Used when no backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullInventorySender;

#[async_trait]
impl InventorySender for NullInventorySender {
    async fn process(&self) -> InventoryResult<()> {
        Ok(())
    }
}

/// Factory handing every entity a [`NullInventorySender`].
pub fn null_sender_factory() -> SenderFactory {
    Arc::new(|_: &EntityKey| Arc::new(NullInventorySender) as Arc<dyn InventorySender>)
}
