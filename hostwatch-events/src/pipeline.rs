//! Inclusion policy and truncation in front of the event sender.

use crate::config::EventPipelineConfig;
use crate::event::SampleEvent;
use crate::flags::{FeatureFlagRetriever, FULL_PROCESS_SAMPLING};
use crate::matcher::IncludeMatcher;
use crate::sender::EventSender;
use hostwatch_types::EntityKey;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Longest string attribute, in characters, the backend stores.
pub const NRDB_LIMIT: usize = 4095;

/// Filters and shapes events on their way to an [`EventSender`].
pub struct EventPipeline {
    enable_process_metrics: Option<bool>,
    matcher: Option<IncludeMatcher>,
    truncate_text_values: bool,
    flags: Arc<dyn FeatureFlagRetriever>,
    sender: Arc<dyn EventSender>,
}

impl EventPipeline {
    pub fn new(
        config: &EventPipelineConfig,
        flags: Arc<dyn FeatureFlagRetriever>,
        sender: Arc<dyn EventSender>,
    ) -> Self {
        Self {
            enable_process_metrics: config.enable_process_metrics,
            matcher: config
                .include_metrics_matchers
                .as_ref()
                .map(IncludeMatcher::from_config),
            truncate_text_values: config.truncate_text_values,
            flags,
            sender,
        }
    }

    /// Whether `event` should be sent at all.
    pub fn should_include(&self, event: &SampleEvent) -> bool {
        if !event.is_process_sample() {
            return true;
        }
        if let Some(enabled) = self.enable_process_metrics {
            return enabled;
        }
        if let Some(matcher) = &self.matcher {
            return matcher.matches(event);
        }
        self.flags
            .get_feature_flag(FULL_PROCESS_SAMPLING)
            .unwrap_or(false)
    }

    /// Filters, optionally truncates and queues `event`.
    ///
    /// Queueing errors are logged and dropped.
    pub fn send(&self, mut event: SampleEvent, entity_key: &EntityKey) {
        if !self.should_include(&event) {
            trace!(entity_key = %entity_key, "Event excluded");
            return;
        }

        if self.truncate_text_values {
            let original = event.clone();
            if event.truncate_text_values(NRDB_LIMIT) {
                debug!(
                    entity_key = %entity_key,
                    original = %original,
                    truncated = %event,
                    "Event text values truncated"
                );
            }
        }

        if let Err(e) = self.sender.queue_event(event, entity_key) {
            warn!(entity_key = %entity_key, error = %e, "Failed to queue event");
        }
    }
}
