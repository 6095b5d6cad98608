//! The capability every collection unit exposes to the agent.

use hostwatch_types::PluginId;
use tracing::info;

/// A collection unit managed by the agent.
///
/// `run` is called on a blocking thread and may loop until [`kill`] is
/// called. Plugins hold an `Arc<AgentContext>` to report inventory and
/// events, and register themselves through
/// [`AgentContext::add_reconnecting`](crate::AgentContext::add_reconnecting)
/// when they must run again after a reconnect.
///
/// [`kill`]: Plugin::kill
pub trait Plugin: Send + Sync {
    fn id(&self) -> PluginId;

    /// Collects. Blocks for as long as the plugin has work to do.
    fn run(&self);

    /// Asks the plugin to stop. Must not block.
    fn kill(&self);

    /// Whether the plugin wraps an out-of-process integration.
    fn is_external(&self) -> bool {
        false
    }

    /// Name of the wrapped integration. `None` for built-in plugins.
    fn external_plugin_name(&self) -> Option<String> {
        None
    }

    /// Logs what the plugin is about to collect. Called once before the
    /// first run.
    fn log_info(&self) {
        info!(plugin = %self.id(), external = self.is_external(), "Plugin info");
    }

    /// Starts the plugin's periodic self check, if it has one. Called once
    /// before the first run. Must not block.
    fn schedule_health_check(&self) {}
}
