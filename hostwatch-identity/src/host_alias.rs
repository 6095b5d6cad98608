//! Host-alias inventory records.

use hostwatch_types::{IdentitySource, SortKey};
use serde::{Deserialize, Serialize};

/// One identity a host is known by, as reported by the host-aliases plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAlias {
    pub alias: String,
    pub source: IdentitySource,
}

impl HostAlias {
    #[must_use]
    pub fn new(source: IdentitySource, alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            source,
        }
    }
}

impl SortKey for HostAlias {
    fn sort_key(&self) -> String {
        self.source.as_str().to_string()
    }
}
