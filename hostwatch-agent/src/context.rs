//! State shared between the agent and its plugins.

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::service::{ServicePidCache, ServiceSource};
use hostwatch_events::{EventPipeline, FeatureFlagRetriever, EventSender, SampleEvent};
use hostwatch_identity::{local_identity_sources, IdentityResolver};
use hostwatch_types::{EntityKey, PluginId, PluginOutput};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const RECONNECT_CHANNEL_CAPACITY: usize = 16;

/// Everything a plugin may touch while it runs.
///
/// Created once per agent and shared as `Arc<AgentContext>` with every
/// plugin. Plugins report inventory through [`send_data`](Self::send_data)
/// and events through [`send_event`](Self::send_event).
pub struct AgentContext {
    config: AgentConfig,
    identity: Arc<IdentityResolver>,
    events: EventPipeline,
    reconnecting: RwLock<HashSet<PluginId>>,
    service_pids: RwLock<ServicePidCache>,
    cancel: CancellationToken,
    reconnect_tx: broadcast::Sender<()>,
    output_tx: mpsc::UnboundedSender<PluginOutput>,
    output_rx: Mutex<Option<mpsc::UnboundedReceiver<PluginOutput>>>,
}

impl AgentContext {
    pub fn new(config: AgentConfig, identity: Arc<IdentityResolver>, events: EventPipeline) -> Self {
        let (reconnect_tx, _) = broadcast::channel(RECONNECT_CHANNEL_CAPACITY);
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        Self {
            config,
            identity,
            events,
            reconnecting: RwLock::new(HashSet::new()),
            service_pids: RwLock::new(ServicePidCache::default()),
            cancel: CancellationToken::new(),
            reconnect_tx,
            output_tx,
            output_rx: Mutex::new(Some(output_rx)),
        }
    }

    /// Builds the identity resolver and event pipeline from `config`.
    ///
    /// The identity is seeded from the display name and the local hostname.
    pub fn from_config(
        config: AgentConfig,
        flags: Arc<dyn FeatureFlagRetriever>,
        event_sender: Arc<dyn EventSender>,
    ) -> Self {
        let identity = Arc::new(IdentityResolver::with_sources(local_identity_sources(
            config.display_name.as_deref(),
        )));
        let events = EventPipeline::new(&config.event_pipeline_config(), flags, event_sender);
        Self::new(config, identity, events)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn identity(&self) -> &Arc<IdentityResolver> {
        &self.identity
    }

    pub fn events(&self) -> &EventPipeline {
        &self.events
    }

    /// The agent's own entity key, once resolved.
    pub fn entity_key(&self) -> Option<EntityKey> {
        self.identity.entity_key()
    }

    // ── Reconnect ────────────────────────────────────────────────

    /// Marks plugins with this id to run again on every reconnect.
    pub fn add_reconnecting(&self, id: PluginId) {
        debug!(plugin = %id, "Plugin registered for reconnect");
        self.reconnecting
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
    }

    pub fn is_reconnecting(&self, id: &PluginId) -> bool {
        self.reconnecting
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }

    /// Signals that the backend connection was re-established.
    pub fn reconnect(&self) {
        match self.reconnect_tx.send(()) {
            Ok(listeners) => info!(listeners, "Reconnect signalled"),
            Err(_) => debug!("Reconnect signalled with no listener"),
        }
    }

    pub(crate) fn subscribe_reconnect(&self) -> broadcast::Receiver<()> {
        self.reconnect_tx.subscribe()
    }

    // ── Cancellation ─────────────────────────────────────────────

    /// Returns a function that stops the agent's main loop, for signal
    /// handlers and the like.
    pub fn cancel_fn(&self) -> impl Fn() + Send + Sync + 'static {
        let cancel = self.cancel.clone();
        move || cancel.cancel()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ── Service pids ─────────────────────────────────────────────

    /// Replaces the pid to service name map reported by `source`.
    pub fn cache_service_pids(&self, source: ServiceSource, pids: HashMap<u32, String>) {
        debug!(source = %source, pids = pids.len(), "Cached service pids");
        self.service_pids
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(source, pids);
    }

    /// Service name owning `pid`, preferring systemd, then upstart,
    /// supervisor and sysvinit.
    pub fn get_service_for_pid(&self, pid: u32) -> Option<String> {
        self.service_pids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .lookup(pid)
            .map(str::to_string)
    }

    // ── Outbound data ────────────────────────────────────────────

    /// Filters and queues an event for `entity_key`.
    pub fn send_event(&self, event: SampleEvent, entity_key: &EntityKey) {
        self.events.send(event, entity_key);
    }

    /// Hands a plugin's inventory to the agent loop.
    pub fn send_data(&self, output: PluginOutput) -> AgentResult<()> {
        self.output_tx
            .send(output)
            .map_err(|_| AgentError::ChannelClosed)
    }

    pub(crate) fn take_output_receiver(&self) -> Option<mpsc::UnboundedReceiver<PluginOutput>> {
        self.output_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}
