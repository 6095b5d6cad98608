//! In-memory form of one `(entity, plugin)` inventory document.

use crate::error::InventoryResult;
use hostwatch_types::{InventoryItem, PluginId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// The full current inventory of one plugin for one entity, keyed by sort key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySnapshot {
    items: BTreeMap<String, Value>,
}

impl InventorySnapshot {
    /// Builds a snapshot from a plugin's dataset.
    ///
    /// Items whose `category/term/sortKey` path is in `ignored_paths` are
    /// dropped. When several items share a sort key, the last one wins.
    pub fn build(
        plugin_id: &PluginId,
        items: &[Box<dyn InventoryItem>],
        ignored_paths: &HashSet<String>,
    ) -> InventoryResult<Self> {
        let mut snapshot = Self::default();
        for item in items {
            let sort_key = item.sort_key();
            if !ignored_paths.is_empty() && ignored_paths.contains(&plugin_id.item_path(&sort_key)) {
                debug!(plugin = %plugin_id, item = %sort_key, "Ignoring inventory item");
                continue;
            }
            snapshot.items.insert(sort_key, strip_nulls(item.to_value()?));
        }
        Ok(snapshot)
    }

    /// Serializes the snapshot with lexicographically sorted keys.
    pub fn to_json_bytes(&self) -> InventoryResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.items)?)
    }

    /// Parses a persisted snapshot.
    pub fn from_json_slice(bytes: &[u8]) -> InventoryResult<Self> {
        Ok(Self {
            items: serde_json::from_slice(bytes)?,
        })
    }

    pub fn get(&self, sort_key: &str) -> Option<&Value> {
        self.items.get(sort_key)
    }

    /// Sort keys in persisted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Drops null object fields at every depth and rebuilds objects in key order.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_nulls_removes_nested_nulls() {
        let value = json!({"a": null, "b": {"c": null, "d": 1}, "e": [{"f": null}]});
        assert_eq!(strip_nulls(value), json!({"b": {"d": 1}, "e": [{}]}));
    }

    #[test]
    fn strip_nulls_keeps_scalars() {
        assert_eq!(strip_nulls(json!("x")), json!("x"));
        assert_eq!(strip_nulls(Value::Null), Value::Null);
    }
}
