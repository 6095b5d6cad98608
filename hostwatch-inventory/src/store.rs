//! Snapshot persistence, the entity registry and the GC sweep.

use crate::error::{InventoryError, InventoryResult};
use crate::sanitize::sanitize_file_name;
use crate::sender::{null_sender_factory, InventorySender, SenderFactory};
use crate::snapshot::InventorySnapshot;
use hostwatch_types::{EntityKey, InventoryItem, PluginId};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Configuration for the inventory store.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Root directory holding one subdirectory per plugin category.
    pub data_dir: PathBuf,
    /// `category/term/sortKey` paths that are never persisted.
    pub ignored_paths: HashSet<String>,
    /// Maximum serialized snapshot size in bytes. `0` disables the limit.
    pub max_inventory_size: usize,
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
struct EntryState {
    retired: bool,
}

/// Registry entry for one entity.
///
/// The entry's lock serialises snapshot writes for the entity against the GC
/// sweep deleting its directories.
pub struct EntityInventory {
    key: EntityKey,
    dir_name: String,
    sender: Arc<dyn InventorySender>,
    state: Mutex<EntryState>,
}

impl EntityInventory {
    fn new(key: EntityKey, sender: Arc<dyn InventorySender>) -> Self {
        let dir_name = sanitize_file_name(key.as_str());
        Self {
            key,
            dir_name,
            sender,
            state: Mutex::new(EntryState::default()),
        }
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Directory name used for this entity under each plugin category.
    pub fn dir_name(&self) -> &str {
        &self.dir_name
    }

    pub fn sender(&self) -> &Arc<dyn InventorySender> {
        &self.sender
    }

    fn lock(&self) -> MutexGuard<'_, EntryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of one GC sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Entities dropped from the registry.
    pub unregistered: Vec<EntityKey>,
    /// Entity directories deleted from disk.
    pub removed_dirs: Vec<PathBuf>,
}

/// Persists plugin inventory and tracks which entities are alive.
pub struct InventoryStore {
    config: StoreConfig,
    registry: Mutex<HashMap<EntityKey, Arc<EntityInventory>>>,
    sender_factory: SenderFactory,
}

impl InventoryStore {
    /// Creates a store whose entities get a no-op sender.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_sender_factory(config, null_sender_factory())
    }

    /// Creates a store whose entities get senders built by `sender_factory`.
    pub fn with_sender_factory(config: StoreConfig, sender_factory: SenderFactory) -> Self {
        Self {
            config,
            registry: Mutex::new(HashMap::new()),
            sender_factory,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the snapshot for `(plugin_id, entity_key)`.
    pub fn snapshot_path(&self, plugin_id: &PluginId, entity_key: &EntityKey) -> PathBuf {
        self.config
            .data_dir
            .join(&plugin_id.category)
            .join(sanitize_file_name(entity_key.as_str()))
            .join(format!("{}.json", plugin_id.term))
    }

    // ── Registry ─────────────────────────────────────────────────

    fn registry(&self) -> MutexGuard<'_, HashMap<EntityKey, Arc<EntityInventory>>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the registry entry for `entity_key`, creating it on first use.
    pub fn register_entity_inventory(&self, entity_key: &EntityKey) -> Arc<EntityInventory> {
        let mut registry = self.registry();
        if let Some(entry) = registry.get(entity_key) {
            return Arc::clone(entry);
        }
        let entry = Arc::new(EntityInventory::new(
            entity_key.clone(),
            (self.sender_factory)(entity_key),
        ));
        debug!(entity_key = %entity_key, "Registered entity inventory");
        registry.insert(entity_key.clone(), Arc::clone(&entry));
        entry
    }

    pub fn is_registered(&self, entity_key: &EntityKey) -> bool {
        self.registry().contains_key(entity_key)
    }

    pub fn entity_keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self.registry().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of every registered entity, for the send loop.
    pub fn inventories(&self) -> Vec<Arc<EntityInventory>> {
        self.registry().values().cloned().collect()
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Persists `dataset` as the snapshot for `(plugin_id, entity_key)`.
    ///
    /// Registers the entity if needed. Returns the path written.
    pub fn store(
        &self,
        plugin_id: &PluginId,
        entity_key: &EntityKey,
        dataset: &[Box<dyn InventoryItem>],
    ) -> InventoryResult<PathBuf> {
        let snapshot = InventorySnapshot::build(plugin_id, dataset, &self.config.ignored_paths)?;
        let bytes = snapshot.to_json_bytes()?;

        let max = self.config.max_inventory_size;
        if max > 0 && bytes.len() > max {
            warn!(
                plugin = %plugin_id,
                entity_key = %entity_key,
                size = bytes.len(),
                max,
                "Inventory snapshot exceeds max inventory size, not storing"
            );
            return Err(InventoryError::TooLarge {
                plugin_id: plugin_id.to_string(),
                size: bytes.len(),
                max,
            });
        }

        let path = self.snapshot_path(plugin_id, entity_key);
        loop {
            let entry = self.register_entity_inventory(entity_key);
            let state = entry.lock();
            if state.retired {
                // Swept between lookup and lock; the next lookup registers afresh.
                continue;
            }
            write_atomic(&path, &bytes).map_err(|source| InventoryError::WriteFailed {
                path: path.clone(),
                source,
            })?;
            debug!(
                plugin = %plugin_id,
                entity_key = %entity_key,
                items = snapshot.len(),
                "Stored inventory snapshot"
            );
            return Ok(path);
        }
    }

    /// Reads back the persisted snapshot for `(plugin_id, entity_key)`.
    pub fn load_snapshot(
        &self,
        plugin_id: &PluginId,
        entity_key: &EntityKey,
    ) -> InventoryResult<InventorySnapshot> {
        let path = self.snapshot_path(plugin_id, entity_key);
        let bytes = fs::read(&path).map_err(|source| InventoryError::ReadFailed { path, source })?;
        InventorySnapshot::from_json_slice(&bytes)
    }

    // ── Garbage collection ───────────────────────────────────────

    /// Mark-and-sweep over the registry and the on-disk tree.
    ///
    /// `reported` is the set of entities that reported during this cycle.
    /// Every other entity is unregistered, and every entity directory whose
    /// name is not the sanitized key of a reported entity is deleted. I/O
    /// errors are logged and skipped.
    pub fn remove_outdated_entities(&self, reported: &HashSet<EntityKey>) -> SweepReport {
        let mut report = SweepReport::default();
        let alive: HashSet<String> = reported
            .iter()
            .map(|key| sanitize_file_name(key.as_str()))
            .collect();

        let stale: Vec<Arc<EntityInventory>> = {
            let mut registry = self.registry();
            let keys: Vec<EntityKey> = registry
                .keys()
                .filter(|key| !reported.contains(*key))
                .cloned()
                .collect();
            keys.iter().filter_map(|key| registry.remove(key)).collect()
        };

        let categories = self.category_dirs();

        for entry in stale {
            let mut state = entry.lock();
            state.retired = true;
            if !alive.contains(entry.dir_name()) {
                for category in &categories {
                    let dir = category.join(entry.dir_name());
                    if remove_dir(&dir) {
                        report.removed_dirs.push(dir);
                    }
                }
            }
            drop(state);
            info!(entity_key = %entry.key(), "Removed outdated entity");
            report.unregistered.push(entry.key().clone());
        }

        for category in &categories {
            for dir in entity_dirs(category) {
                let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                    continue;
                };
                if alive.contains(&name) {
                    continue;
                }
                if is_tombstone(&name) {
                    remove_dir(&dir);
                    continue;
                }

                // Moved aside under the registry lock so a concurrent first
                // write for the same entity starts from a fresh directory.
                let tombstone = category.join(tombstone_name(&name));
                let moved = {
                    let registry = self.registry();
                    if registry.values().any(|entry| entry.dir_name() == name) {
                        continue;
                    }
                    match fs::rename(&dir, &tombstone) {
                        Ok(()) => true,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                        Err(e) => {
                            debug!(dir = %dir.display(), error = %e, "Could not move orphan aside, removing in place");
                            if remove_dir(&dir) {
                                report.removed_dirs.push(dir.clone());
                            }
                            false
                        }
                    }
                };
                if moved {
                    remove_dir(&tombstone);
                    report.removed_dirs.push(dir);
                }
            }
        }

        report
    }

    fn category_dirs(&self) -> Vec<PathBuf> {
        subdirectories(&self.config.data_dir)
    }
}

const TOMBSTONE_SUFFIX: &str = ".removing";

/// Orphans are renamed to this before deletion.
fn tombstone_name(dir_name: &str) -> String {
    format!(".{dir_name}{TOMBSTONE_SUFFIX}")
}

fn is_tombstone(dir_name: &str) -> bool {
    dir_name.starts_with('.') && dir_name.ends_with(TOMBSTONE_SUFFIX)
}

fn entity_dirs(category: &Path) -> Vec<PathBuf> {
    subdirectories(category)
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to list inventory directory");
            return Vec::new();
        }
    };

    entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to read inventory directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect()
}

/// Deletes `dir` recursively. Returns whether something was removed.
fn remove_dir(dir: &Path) -> bool {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "Removed entity inventory directory");
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to remove entity inventory directory");
            false
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}
