//! Identity source snapshots and key resolution.

use crate::error::{IdentityError, IdentityResult};
use crate::host_alias::HostAlias;
use hostwatch_types::{EntityKey, IdentitySource, InventoryItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Snapshot of every identity value known for the local host.
///
/// Values may be empty; an empty value never wins resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySourceMap(HashMap<IdentitySource, String>);

impl IdentitySourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, source: IdentitySource, value: impl Into<String>) -> Self {
        self.insert(source, value);
        self
    }

    pub fn insert(&mut self, source: IdentitySource, value: impl Into<String>) {
        self.0.insert(source, value.into());
    }

    #[must_use]
    pub fn get(&self, source: IdentitySource) -> Option<&str> {
        self.0.get(&source).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new map with this map's values overlaid by every host-alias
    /// record found in `items`. Items of other types are ignored.
    #[must_use]
    pub fn merged_with_aliases(&self, items: &[Box<dyn InventoryItem>]) -> Self {
        let mut merged = self.clone();
        for alias in items
            .iter()
            .filter_map(|item| item.as_any().downcast_ref::<HostAlias>())
        {
            merged.insert(alias.source, alias.alias.clone());
        }
        merged
    }

    /// Resolves the canonical entity key. See [`resolve_entity_key`].
    pub fn resolve_entity_key(&self) -> IdentityResult<EntityKey> {
        IdentitySource::PRIORITY
            .iter()
            .filter_map(|source| self.get(*source))
            .find(|value| !value.is_empty())
            .map(EntityKey::from)
            .ok_or(IdentityError::NoIdentityAvailable)
    }
}

impl FromIterator<(IdentitySource, String)> for IdentitySourceMap {
    fn from_iter<I: IntoIterator<Item = (IdentitySource, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Returns the highest-priority non-empty identity in `sources`.
///
/// Also used for the short entity name; both follow the same chain.
pub fn resolve_entity_key(sources: &IdentitySourceMap) -> IdentityResult<EntityKey> {
    sources.resolve_entity_key()
}
