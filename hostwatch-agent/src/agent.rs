//! The plugin orchestrator and its main loop.

use crate::context::AgentContext;
use crate::error::{AgentError, AgentResult};
use crate::plugin::Plugin;
use hostwatch_connect::{check_connectivity, ConnectivityBootstrapper, ReachabilityProbe};
use hostwatch_inventory::InventoryStore;
use hostwatch_types::{EntityKey, PluginId, PluginOutput};
use std::collections::HashSet;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

/// Runs plugins and turns their output into persisted, transmitted inventory.
pub struct Agent {
    ctx: Arc<AgentContext>,
    store: Arc<InventoryStore>,
    plugins: Vec<Arc<dyn Plugin>>,
    reconnect_listener: Mutex<Option<JoinHandle<()>>>,
    terminated: AtomicBool,
}

impl Agent {
    pub fn new(ctx: Arc<AgentContext>, store: Arc<InventoryStore>) -> AgentResult<Self> {
        ctx.config().validate()?;
        Ok(Self {
            ctx,
            store,
            plugins: Vec::new(),
            reconnect_listener: Mutex::new(None),
            terminated: AtomicBool::new(false),
        })
    }

    /// Checks that the collector is reachable, retrying as configured, then
    /// builds the agent.
    pub async fn bootstrap<P>(
        ctx: Arc<AgentContext>,
        store: Arc<InventoryStore>,
        probe: &P,
    ) -> AgentResult<Self>
    where
        P: ReachabilityProbe + ?Sized,
    {
        let policy = ctx.config().retry_policy();
        check_connectivity(probe, &policy, &ctx.cancellation_token()).await?;
        Self::new(ctx, store)
    }

    /// [`bootstrap`](Self::bootstrap) against the configured collector URL
    /// over HTTP.
    pub async fn bootstrap_http(
        ctx: Arc<AgentContext>,
        store: Arc<InventoryStore>,
        user_agent: &str,
    ) -> AgentResult<Self> {
        let config = ctx.config();
        let bootstrapper = ConnectivityBootstrapper::new(
            config.collector_url.clone(),
            config.credentials(user_agent),
            config.retry_policy(),
        )?;
        bootstrapper.run(&ctx.cancellation_token()).await?;
        Self::new(ctx, store)
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.ctx
    }

    pub fn store(&self) -> &Arc<InventoryStore> {
        &self.store
    }

    // ── Plugins ──────────────────────────────────────────────────

    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) {
        match plugin.external_plugin_name() {
            Some(name) => info!(plugin = %plugin.id(), external = %name, "Plugin registered"),
            None => info!(plugin = %plugin.id(), "Plugin registered"),
        }
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Logs each plugin's info, schedules its health check and runs it once
    /// on a blocking thread, then starts re-running reconnect-aware plugins
    /// on every reconnect signal.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_plugins(&self) {
        let reconnects = self.ctx.subscribe_reconnect();

        for plugin in &self.plugins {
            plugin.log_info();
            plugin.schedule_health_check();
            spawn_plugin(Arc::clone(plugin));
        }
        info!(plugins = self.plugins.len(), "Plugins started");

        let listener = tokio::spawn(reconnect_listener(
            Arc::clone(&self.ctx),
            self.plugins.clone(),
            reconnects,
        ));
        let previous = self
            .reconnect_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(listener);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Kills every plugin. Only the first call has an effect.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(plugins = self.plugins.len(), "Terminating plugins");
        for plugin in &self.plugins {
            plugin.kill();
        }
    }

    // ── Main loop ────────────────────────────────────────────────

    /// Consumes plugin output and drives the reap and send timers until the
    /// context is cancelled. Can only be called once.
    pub async fn run(&self) -> AgentResult<()> {
        let mut outputs = self
            .ctx
            .take_output_receiver()
            .ok_or(AgentError::AlreadyRunning)?;
        let cancel = self.ctx.cancellation_token();
        let config = self.ctx.config();

        let mut reported: HashSet<EntityKey> = HashSet::new();
        let mut next_reap = Instant::now() + config.first_reap_interval;
        let mut next_send = Instant::now() + config.send_interval;

        info!(forward_only = config.is_forward_only, "Agent loop started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(output) = outputs.recv() => {
                    self.handle_output(output, &mut reported).await;
                }
                _ = sleep_until(next_reap) => {
                    self.reap(&mut reported).await;
                    next_reap = Instant::now() + config.reap_interval;
                }
                _ = sleep_until(next_send) => {
                    self.send_inventories().await;
                    next_send = Instant::now() + config.send_interval;
                }
            }
        }

        if let Some(listener) = self
            .reconnect_listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            listener.abort();
        }
        info!("Agent loop stopped");
        Ok(())
    }

    async fn handle_output(&self, output: PluginOutput, reported: &mut HashSet<EntityKey>) {
        let PluginOutput { id, entity, data } = output;

        if id == PluginId::host_aliases() {
            if let Err(e) = self.ctx.identity().update_from_dataset(&data) {
                warn!(plugin = %id, error = %e, "Host aliases did not resolve an entity key");
            }
        }

        let entity = if entity.is_empty() {
            match self.ctx.entity_key() {
                Some(key) => key,
                None => {
                    warn!(plugin = %id, "Dropping plugin output, agent entity key unknown");
                    return;
                }
            }
        } else {
            entity
        };
        reported.insert(entity.clone());

        let store = Arc::clone(&self.store);
        let stored = tokio::task::spawn_blocking(move || {
            let result = store.store(&id, &entity, &data);
            (id, entity, result)
        })
        .await;

        match stored {
            Ok((id, entity, Ok(path))) => {
                trace!(plugin = %id, entity_key = %entity, path = %path.display(), "Plugin output stored");
            }
            Ok((id, entity, Err(e))) => {
                warn!(plugin = %id, entity_key = %entity, error = %e, "Failed to store plugin output");
            }
            Err(e) => warn!(error = %e, "Store task failed"),
        }
    }

    async fn reap(&self, reported: &mut HashSet<EntityKey>) {
        if let Some(own) = self.ctx.entity_key() {
            reported.insert(own);
        }
        let alive = mem::take(reported);

        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.remove_outdated_entities(&alive)).await {
            Ok(report) => debug!(
                unregistered = report.unregistered.len(),
                removed_dirs = report.removed_dirs.len(),
                "Reaped outdated entities"
            ),
            Err(e) => warn!(error = %e, "Reap task failed"),
        }
    }

    async fn send_inventories(&self) {
        if self.ctx.config().is_forward_only {
            trace!("Forward-only mode, not sending inventory");
            return;
        }
        for inventory in self.store.inventories() {
            if let Err(e) = inventory.sender().process().await {
                warn!(entity_key = %inventory.key(), error = %e, "Failed to send inventory");
            }
        }
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if let Some(listener) = self
            .reconnect_listener
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            listener.abort();
        }
    }
}

fn spawn_plugin(plugin: Arc<dyn Plugin>) {
    debug!(plugin = %plugin.id(), "Running plugin");
    drop(tokio::task::spawn_blocking(move || plugin.run()));
}

async fn reconnect_listener(
    ctx: Arc<AgentContext>,
    plugins: Vec<Arc<dyn Plugin>>,
    mut reconnects: tokio::sync::broadcast::Receiver<()>,
) {
    let cancel = ctx.cancellation_token();
    loop {
        let signal = tokio::select! {
            _ = cancel.cancelled() => return,
            signal = reconnects.recv() => signal,
        };
        // A lagged receiver still owes one re-run per skipped signal.
        let signals = match signal {
            Ok(()) => 1,
            Err(RecvError::Lagged(skipped)) => {
                debug!(skipped, "Reconnect listener lagged");
                skipped
            }
            Err(RecvError::Closed) => return,
        };

        for _ in 0..signals {
            let mut rerun = 0;
            for plugin in plugins.iter().filter(|p| ctx.is_reconnecting(&p.id())) {
                spawn_plugin(Arc::clone(plugin));
                rerun += 1;
            }
            info!(plugins = rerun, "Re-ran plugins after reconnect");
        }
    }
}
