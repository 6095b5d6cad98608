//! Outbound sample events.
//!
//! Plugins emit [`SampleEvent`]s. Before an event is queued for delivery the
//! [`EventPipeline`] decides whether it is wanted at all (process samples
//! are opt-in) and optionally truncates oversized string attributes.
//!
//! # Process sample inclusion
//!
//! The first rule that applies wins:
//!
//! 1. `enable_process_metrics` set explicitly in the configuration.
//! 2. `include_metrics_matchers` present (even empty): include when any
//!    matcher matches the sample.
//! 3. The `full_process_sampling` feature flag, when found.
//! 4. Otherwise excluded.
//!
//! Every other event type is always included.

mod config;
mod error;
mod event;
mod flags;
mod matcher;
mod pipeline;
mod sender;

pub use config::EventPipelineConfig;
pub use error::{EventError, EventResult};
pub use event::{ProcessSample, SampleEvent, EVENT_TYPE_KEY, PROCESS_SAMPLE_EVENT_TYPE};
pub use flags::{FeatureFlagRetriever, StaticFeatureFlags, FULL_PROCESS_SAMPLING};
pub use matcher::{IncludeMatcher, ProcessField};
pub use pipeline::{EventPipeline, NRDB_LIMIT};
pub use sender::{ChannelEventSender, EventSender, QueuedEvent};
