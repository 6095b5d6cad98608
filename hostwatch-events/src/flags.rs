//! Remotely controlled feature flags.

use std::collections::HashMap;
use std::sync::RwLock;

/// Flag that turns on process samples when nothing is configured locally.
pub const FULL_PROCESS_SAMPLING: &str = "full_process_sampling";

/// Source of feature flag values.
///
/// `None` means the flag is unknown. Implementations fold retrieval
/// failures into `None`.
pub trait FeatureFlagRetriever: Send + Sync {
    fn get_feature_flag(&self, name: &str) -> Option<bool>;
}

/// Feature flags held in memory.
#[derive(Debug, Default)]
pub struct StaticFeatureFlags {
    flags: RwLock<HashMap<String, bool>>,
}

impl StaticFeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(self, name: impl Into<String>, enabled: bool) -> Self {
        self.set(name, enabled);
        self
    }

    pub fn set(&self, name: impl Into<String>, enabled: bool) {
        self.flags
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), enabled);
    }

    pub fn remove(&self, name: &str) {
        self.flags
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }
}

impl FeatureFlagRetriever for StaticFeatureFlags {
    fn get_feature_flag(&self, name: &str) -> Option<bool> {
        self.flags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
    }
}
