//! Include matchers for process samples.
//!
//! Patterns come in three forms:
//!
//! - `nginx`: the attribute must equal the literal
//! - `ngin*`: `*` matches any run of characters, anchored at both ends
//! - `regex "^ngin.x$"`: unanchored regular expression search

use crate::event::SampleEvent;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

/// Process attribute a matcher applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessField {
    Name,
    Executable,
    CommandLine,
}

impl ProcessField {
    /// Parses the configuration name of a field.
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "process.name" => Some(Self::Name),
            "process.executable" => Some(Self::Executable),
            "process.commandLine" => Some(Self::CommandLine),
            _ => None,
        }
    }

    /// Event attribute holding this field.
    pub fn attribute(self) -> &'static str {
        match self {
            Self::Name => "processDisplayName",
            Self::Executable => "executablePath",
            Self::CommandLine => "commandLine",
        }
    }
}

#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Expression(Regex),
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self, regex::Error> {
        let trimmed = raw.trim();
        if let Some(expr) = trimmed
            .strip_prefix("regex")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('"'))
            .and_then(|rest| rest.strip_suffix('"'))
        {
            return Regex::new(expr).map(Self::Expression);
        }
        if trimmed.contains('*') {
            let body = trimmed
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            return Regex::new(&format!("^{body}$")).map(Self::Expression);
        }
        Ok(Self::Literal(trimmed.to_string()))
    }

    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == value,
            Self::Expression(re) => re.is_match(value),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldMatcher {
    field: ProcessField,
    pattern: Pattern,
}

/// A set of process matchers; a sample is included when any one matches.
#[derive(Debug, Clone, Default)]
pub struct IncludeMatcher {
    matchers: Vec<FieldMatcher>,
}

impl IncludeMatcher {
    /// Builds matchers from the `include_metrics_matchers` configuration.
    ///
    /// Unknown fields and invalid patterns are logged and skipped.
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> Self {
        let mut names: Vec<&String> = config.keys().collect();
        names.sort();

        let mut matchers = Vec::new();
        for name in names {
            let Some(field) = ProcessField::from_config_name(name) else {
                warn!(field = %name, "Unknown process matcher field, ignoring");
                continue;
            };
            for raw in &config[name] {
                match Pattern::parse(raw) {
                    Ok(pattern) => matchers.push(FieldMatcher { field, pattern }),
                    Err(e) => {
                        warn!(field = %name, pattern = %raw, error = %e, "Invalid process matcher, ignoring");
                    }
                }
            }
        }
        Self { matchers }
    }

    /// Whether any matcher matches the event's attributes.
    pub fn matches(&self, event: &SampleEvent) -> bool {
        self.matchers.iter().any(|m| {
            event
                .get_str(m.field.attribute())
                .is_some_and(|value| m.pattern.is_match(value))
        })
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}
