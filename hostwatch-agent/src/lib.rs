//! The hostwatch agent runtime.
//!
//! [`Agent`] owns the registered [`Plugin`]s and the inventory store. It
//! starts every plugin once, re-runs reconnect-aware plugins whenever the
//! backend connection is re-established, and runs a single loop that
//!
//! - stores every [`PluginOutput`](hostwatch_types::PluginOutput) a plugin
//!   hands in through [`AgentContext::send_data`], updating the host's
//!   identity when the output carries host aliases,
//! - reaps entities that stopped reporting on every reap tick,
//! - ships pending inventory on every send tick, unless forward-only.
//!
//! Cancelling the context stops the loop; [`Agent::terminate`] stops the
//! plugins.

mod agent;
mod config;
mod context;
mod error;
mod plugin;
mod service;

pub use agent::Agent;
pub use config::{format_duration, parse_duration, AgentConfig};
pub use context::AgentContext;
pub use error::{AgentError, AgentResult};
pub use plugin::Plugin;
pub use service::ServiceSource;
