//! Inventory snapshot storage for hostwatch.
//!
//! Persists the inventory each plugin reports for each entity as a single
//! JSON document and garbage-collects entities that stop reporting.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/<category>/<sanitized entity key>/<term>.json
//! ```
//!
//! Each document is a JSON object whose keys are the items' sort keys in
//! lexicographic order. Null item fields are omitted.
//!
//! # Garbage collection
//!
//! [`InventoryStore::remove_outdated_entities`] is a mark-and-sweep pass run
//! once per reap cycle: registered entities that did not report are dropped
//! from the registry, and every entity directory on disk that does not
//! belong to a reporting entity is deleted, including leftovers from
//! previous runs.

mod error;
mod sanitize;
mod sender;
mod snapshot;
mod store;

pub use error::{InventoryError, InventoryResult};
pub use sanitize::sanitize_file_name;
pub use sender::{null_sender_factory, InventorySender, NullInventorySender, SenderFactory};
pub use snapshot::InventorySnapshot;
pub use store::{EntityInventory, InventoryStore, StoreConfig, SweepReport};
