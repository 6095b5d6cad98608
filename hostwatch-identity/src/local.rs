//! Identity values the host can report about itself.

use crate::source_map::IdentitySourceMap;
use hostwatch_types::IdentitySource;
use tracing::warn;

/// Gets the machine hostname, if the OS reports a valid one.
fn get_hostname() -> Option<String> {
    match hostname::get() {
        Ok(name) => name.into_string().ok().filter(|name| !name.is_empty()),
        Err(e) => {
            warn!("Failed to read hostname: {}", e);
            None
        }
    }
}

/// First label of a fully-qualified hostname.
pub fn short_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

/// Builds the source map from locally known values: the configured display
/// name and the OS hostname in both its full and short forms.
pub fn local_identity_sources(display_name: Option<&str>) -> IdentitySourceMap {
    let mut sources = IdentitySourceMap::new();
    if let Some(name) = display_name.filter(|name| !name.is_empty()) {
        sources.insert(IdentitySource::DisplayName, name);
    }
    if let Some(hostname) = get_hostname() {
        sources.insert(IdentitySource::HostnameShort, short_hostname(&hostname));
        sources.insert(IdentitySource::Hostname, hostname);
    }
    sources
}
