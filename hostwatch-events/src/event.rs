//! Sample events and the typed process sample.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Attribute holding an event's type name.
pub const EVENT_TYPE_KEY: &str = "eventType";

/// Event type of process samples.
pub const PROCESS_SAMPLE_EVENT_TYPE: &str = "ProcessSample";

/// A flat bag of attributes describing one observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleEvent(Map<String, Value>);

impl SampleEvent {
    /// Creates an event of the given type with no other attributes.
    pub fn new(event_type: impl Into<String>) -> Self {
        let mut attributes = Map::new();
        attributes.insert(EVENT_TYPE_KEY.to_string(), Value::String(event_type.into()));
        Self(attributes)
    }

    pub fn from_map(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of an attribute, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.get_str(EVENT_TYPE_KEY)
    }

    pub fn is_process_sample(&self) -> bool {
        self.event_type() == Some(PROCESS_SAMPLE_EVENT_TYPE)
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Cuts every string attribute longer than `limit` characters down to
    /// exactly `limit`. Returns whether anything was cut.
    pub fn truncate_text_values(&mut self, limit: usize) -> bool {
        let mut truncated = false;
        for value in self.0.values_mut() {
            if let Value::String(text) = value {
                if let Some((end, _)) = text.char_indices().nth(limit) {
                    text.truncate(end);
                    truncated = true;
                }
            }
        }
        truncated
    }
}

impl fmt::Display for SampleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<Map<String, Value>> for SampleEvent {
    fn from(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }
}

/// Metrics for one running process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSample {
    pub process_display_name: String,
    pub process_id: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command_line: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub executable_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_resident_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contained_in: Option<String>,
}

impl ProcessSample {
    pub fn new(display_name: impl Into<String>, pid: u32) -> Self {
        Self {
            process_display_name: display_name.into(),
            process_id: pid,
            ..Default::default()
        }
    }

    /// Converts to a generic event tagged with the process sample type.
    pub fn to_event(&self) -> serde_json::Result<SampleEvent> {
        let mut attributes = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        attributes.insert(
            EVENT_TYPE_KEY.to_string(),
            Value::String(PROCESS_SAMPLE_EVENT_TYPE.to_string()),
        );
        Ok(SampleEvent(attributes))
    }

    /// Reads a process sample back out of a generic event.
    pub fn from_event(event: &SampleEvent) -> Option<Self> {
        if !event.is_process_sample() {
            return None;
        }
        serde_json::from_value(Value::Object(event.0.clone())).ok()
    }
}
