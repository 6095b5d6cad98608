//! Identifier types used throughout the agent runtime.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The resolved string identifying a monitored entity (usually a host).
///
/// Keys are derived from identity sources and are never persisted on their
/// own; whenever the sources change the key is recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Wraps an already-resolved key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the key is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifies a collection unit as a `(category, term)` pair.
///
/// Stable for the lifetime of the process. Displayed as `category/term`,
/// which is also the prefix of every inventory path the plugin produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginId {
    pub category: String,
    pub term: String,
}

impl PluginId {
    /// Creates a plugin id from its two components.
    #[must_use]
    pub fn new(category: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            term: term.into(),
        }
    }

    /// The plugin that reports host aliases used for identity resolution.
    #[must_use]
    pub fn host_aliases() -> Self {
        Self::new("metadata", "host_aliases")
    }

    /// Logical inventory path of an item produced by this plugin.
    #[must_use]
    pub fn item_path(&self, sort_key: &str) -> String {
        format!("{}/{}/{}", self.category, self.term, sort_key)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.term)
    }
}

impl FromStr for PluginId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((category, term)) if !category.is_empty() && !term.is_empty() => {
                Ok(Self::new(category, term))
            }
            _ => Err(crate::Error::InvalidPluginId(s.to_string())),
        }
    }
}
