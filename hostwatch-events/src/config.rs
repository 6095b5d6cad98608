//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Settings that decide which events are sent and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventPipelineConfig {
    /// Explicit switch for process samples. `None` defers to the matchers
    /// and then to the feature flag.
    pub enable_process_metrics: Option<bool>,
    /// Field name to patterns. Present-but-empty still takes precedence over
    /// the feature flag.
    pub include_metrics_matchers: Option<HashMap<String, Vec<String>>>,
    /// Truncate string attributes longer than [`NRDB_LIMIT`](crate::NRDB_LIMIT).
    pub truncate_text_values: bool,
}
