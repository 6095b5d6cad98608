//! Which service manager owns which pid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Service managers that report pid ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceSource {
    Systemd,
    Upstart,
    Supervisor,
    Sysvinit,
}

impl ServiceSource {
    /// Lookup order when several managers claim the same pid.
    pub const PRIORITY: [ServiceSource; 4] = [
        ServiceSource::Systemd,
        ServiceSource::Upstart,
        ServiceSource::Supervisor,
        ServiceSource::Sysvinit,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Systemd => "systemd",
            Self::Upstart => "upstart",
            Self::Supervisor => "supervisor",
            Self::Sysvinit => "sysvinit",
        }
    }
}

impl fmt::Display for ServiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pid to service name, per service manager.
#[derive(Debug, Default, Clone)]
pub(crate) struct ServicePidCache {
    by_source: HashMap<ServiceSource, HashMap<u32, String>>,
}

impl ServicePidCache {
    /// Replaces everything previously cached for `source`.
    pub(crate) fn replace(&mut self, source: ServiceSource, pids: HashMap<u32, String>) {
        self.by_source.insert(source, pids);
    }

    pub(crate) fn lookup(&self, pid: u32) -> Option<&str> {
        ServiceSource::PRIORITY
            .iter()
            .filter_map(|source| self.by_source.get(source))
            .find_map(|pids| pids.get(&pid))
            .map(String::as_str)
    }
}
