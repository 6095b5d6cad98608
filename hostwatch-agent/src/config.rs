//! Agent configuration, loaded from TOML.

use crate::error::{AgentError, AgentResult};
use hostwatch_connect::{Credentials, RetryPolicy};
use hostwatch_events::EventPipelineConfig;
use hostwatch_inventory::StoreConfig;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Everything the agent runtime reads from its configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Root of the on-disk inventory tree.
    pub data_dir: PathBuf,
    pub collector_url: String,
    pub license_key: Option<String>,
    /// User-chosen name for this host. Outranks hostnames as identity.
    pub display_name: Option<String>,
    /// `category/term/sortKey` paths never persisted.
    pub ignored_inventory_paths: HashSet<String>,
    /// Largest snapshot written, in bytes. `0` disables the limit.
    pub max_inventory_size: usize,
    /// Send events only; inventory is stored but never transmitted.
    pub is_forward_only: bool,
    #[serde(with = "duration_str")]
    pub first_reap_interval: Duration,
    #[serde(with = "duration_str")]
    pub reap_interval: Duration,
    #[serde(with = "duration_str")]
    pub send_interval: Duration,
    /// Retries of the startup connectivity check. Negative retries forever.
    pub startup_connection_retries: i32,
    /// Upper bound for one connectivity attempt.
    #[serde(with = "duration_str")]
    pub startup_connection_timeout: Duration,
    pub enable_process_metrics: Option<bool>,
    pub include_metrics_matchers: Option<HashMap<String, Vec<String>>>,
    pub truncate_text_values: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/db/hostwatch/data"),
            collector_url: "https://collector.hostwatch.io".to_string(),
            license_key: None,
            display_name: None,
            ignored_inventory_paths: HashSet::new(),
            max_inventory_size: 3 * 1000 * 1000,
            is_forward_only: false,
            first_reap_interval: Duration::from_secs(1),
            reap_interval: Duration::from_secs(10),
            send_interval: Duration::from_secs(10),
            startup_connection_retries: 6,
            startup_connection_timeout: Duration::from_secs(10),
            enable_process_metrics: None,
            include_metrics_matchers: None,
            truncate_text_values: true,
        }
    }
}

impl AgentConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(contents: &str) -> AgentResult<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| AgentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        info!("Loaded agent config from {:?}", path);
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> AgentResult<()> {
        if self.reap_interval.is_zero() {
            return Err(AgentError::Config("reap_interval must be positive".into()));
        }
        if self.send_interval.is_zero() {
            return Err(AgentError::Config("send_interval must be positive".into()));
        }
        if self.startup_connection_timeout.is_zero() {
            return Err(AgentError::Config(
                "startup_connection_timeout must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.startup_connection_retries,
            attempt_timeout: self.startup_connection_timeout,
            ..Default::default()
        }
    }

    pub fn credentials(&self, user_agent: impl Into<String>) -> Credentials {
        let credentials = Credentials::new(user_agent);
        match &self.license_key {
            Some(key) => credentials.with_license_key(key.clone()),
            None => credentials,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: self.data_dir.clone(),
            ignored_paths: self.ignored_inventory_paths.clone(),
            max_inventory_size: self.max_inventory_size,
        }
    }

    pub fn event_pipeline_config(&self) -> EventPipelineConfig {
        EventPipelineConfig {
            enable_process_metrics: self.enable_process_metrics,
            include_metrics_matchers: self.include_metrics_matchers.clone(),
            truncate_text_values: self.truncate_text_values,
        }
    }
}

/// Parses durations such as `10ms`, `30s` or `1m30s`.
///
/// Units: `h`, `m`, `s`, `ms`, `us` (or `µs`), `ns`. A bare `0` is zero.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("Invalid number in duration: '{s}'"))?;
        rest = &rest[num_len..];

        let unit_len = rest.find(is_number).unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "h" => 3_600_000_000_000.0,
            "m" => 60_000_000_000.0,
            "s" => 1_000_000_000.0,
            "ms" => 1_000_000.0,
            "us" | "µs" => 1_000.0,
            "ns" => 1.0,
            "" => return Err(format!("Missing unit in duration: '{s}'")),
            other => return Err(format!("Unknown duration unit '{other}' in '{s}'")),
        };
        rest = &rest[unit_len..];

        total += Duration::from_nanos((value * nanos_per_unit).round() as u64);
    }
    Ok(total)
}

/// Renders a duration in the largest unit that represents it exactly.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        "0s".to_string()
    } else if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{nanos}ns")
    }
}

/// Serde helper storing `Duration` as a unit-suffixed string.
mod duration_str {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
