//! Kinds of identity data a host can be known by.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A source of identity information for the local host.
///
/// The declaration order is the resolution priority: cloud instance
/// identifiers first, then the user-configured display name, then hostnames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentitySource {
    #[serde(rename = "instance-id")]
    InstanceId,
    #[serde(rename = "azure_vm_id")]
    AzureVmId,
    #[serde(rename = "gcp_vm_id")]
    GcpVmId,
    #[serde(rename = "alibaba_vm_id")]
    AlibabaVmId,
    #[serde(rename = "display_name")]
    DisplayName,
    #[serde(rename = "hostname_short")]
    HostnameShort,
    #[serde(rename = "hostname")]
    Hostname,
}

impl IdentitySource {
    /// All sources, highest priority first.
    pub const PRIORITY: [IdentitySource; 7] = [
        IdentitySource::InstanceId,
        IdentitySource::AzureVmId,
        IdentitySource::GcpVmId,
        IdentitySource::AlibabaVmId,
        IdentitySource::DisplayName,
        IdentitySource::HostnameShort,
        IdentitySource::Hostname,
    ];

    /// Wire name of the source, as reported by host-alias records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InstanceId => "instance-id",
            Self::AzureVmId => "azure_vm_id",
            Self::GcpVmId => "gcp_vm_id",
            Self::AlibabaVmId => "alibaba_vm_id",
            Self::DisplayName => "display_name",
            Self::HostnameShort => "hostname_short",
            Self::Hostname => "hostname",
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentitySource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRIORITY
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownIdentitySource(s.to_string()))
    }
}
