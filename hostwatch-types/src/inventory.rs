//! Inventory items produced by plugins.
//!
//! An inventory item is any serializable value with a deterministic sort key.
//! Items are stored per `(entity, plugin)` keyed by that sort key, so two
//! items with the same key overwrite one another.

use crate::{EntityKey, PluginId};
use serde::Serialize;
use std::any::Any;
use std::fmt;

/// Provides the key an inventory item is stored under.
pub trait SortKey {
    fn sort_key(&self) -> String;
}

/// Object-safe view of an inventory item.
///
/// Implemented for every `Serialize + SortKey` type, so plugins only derive
/// `Serialize` and implement [`SortKey`].
pub trait InventoryItem: Send + Sync {
    /// Key the item is stored under.
    fn sort_key(&self) -> String;

    /// JSON rendering of the item.
    fn to_value(&self) -> serde_json::Result<serde_json::Value>;

    /// Allows structural downcasts (e.g. to recognise host-alias records).
    fn as_any(&self) -> &dyn Any;
}

impl<T> InventoryItem for T
where
    T: Serialize + SortKey + Send + Sync + 'static,
{
    fn sort_key(&self) -> String {
        SortKey::sort_key(self)
    }

    fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The items a plugin reported in one collection pass.
pub type PluginInventoryDataset = Vec<Box<dyn InventoryItem>>;

/// A plugin's report for a single entity.
pub struct PluginOutput {
    pub id: PluginId,
    pub entity: EntityKey,
    pub data: PluginInventoryDataset,
}

impl PluginOutput {
    #[must_use]
    pub fn new(id: PluginId, entity: EntityKey, data: PluginInventoryDataset) -> Self {
        Self { id, entity, data }
    }
}

impl fmt::Debug for PluginOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginOutput")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("items", &self.data.len())
            .finish()
    }
}
