//! Owned identity state shared with the rest of the agent.

use crate::error::IdentityResult;
use crate::source_map::IdentitySourceMap;
use hostwatch_types::{EntityKey, InventoryItem};
use std::sync::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Holds the current identity sources and the key resolved from them.
///
/// Every successful resolution replaces the previous key and is published to
/// all receivers obtained through [`IdentityResolver::subscribe`]. A failed
/// resolution leaves both the sources and the published key untouched.
pub struct IdentityResolver {
    sources: RwLock<IdentitySourceMap>,
    key_tx: watch::Sender<Option<EntityKey>>,
}

impl IdentityResolver {
    /// Creates a resolver with no sources and no key.
    pub fn new() -> Self {
        let (key_tx, _) = watch::channel(None);
        Self {
            sources: RwLock::new(IdentitySourceMap::new()),
            key_tx,
        }
    }

    /// Creates a resolver and immediately tries to resolve `sources`.
    ///
    /// Resolution failure is not fatal here: the resolver keeps the sources
    /// and waits for more identity data to arrive.
    pub fn with_sources(sources: IdentitySourceMap) -> Self {
        let resolver = Self::new();
        if let Err(e) = resolver.set_sources(sources) {
            warn!("Initial identity resolution failed: {}", e);
        }
        resolver
    }

    /// Replaces the source map and publishes the newly resolved key.
    pub fn set_sources(&self, sources: IdentitySourceMap) -> IdentityResult<EntityKey> {
        let key = sources.resolve_entity_key()?;
        *self.sources.write().unwrap_or_else(|e| e.into_inner()) = sources;
        self.publish(key.clone());
        Ok(key)
    }

    /// Rebuilds the source map from host-alias records in `items` and
    /// re-resolves the key.
    pub fn update_from_dataset(&self, items: &[Box<dyn InventoryItem>]) -> IdentityResult<EntityKey> {
        let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
        let rebuilt = sources.merged_with_aliases(items);
        let key = rebuilt.resolve_entity_key()?;
        debug!(sources = rebuilt.len(), "Identity sources rebuilt from host aliases");
        *sources = rebuilt;
        drop(sources);
        self.publish(key.clone());
        Ok(key)
    }

    /// The most recently resolved key, if any.
    pub fn entity_key(&self) -> Option<EntityKey> {
        self.key_tx.borrow().clone()
    }

    /// A copy of the current source map.
    pub fn sources(&self) -> IdentitySourceMap {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns a receiver that observes every published key.
    pub fn subscribe(&self) -> watch::Receiver<Option<EntityKey>> {
        self.key_tx.subscribe()
    }

    fn publish(&self, key: EntityKey) {
        let changed = self.key_tx.send_if_modified(|current| {
            if current.as_ref() == Some(&key) {
                false
            } else {
                *current = Some(key.clone());
                true
            }
        });
        if changed {
            info!(entity_key = %key, "Entity key resolved");
        }
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}
