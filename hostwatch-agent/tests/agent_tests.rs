use async_trait::async_trait;
use hostwatch_agent::{Agent, AgentConfig, AgentContext, AgentError, Plugin};
use hostwatch_connect::{ConnectError, ConnectResult, ReachabilityProbe};
use hostwatch_events::{ChannelEventSender, EventPipeline, StaticFeatureFlags};
use hostwatch_identity::{HostAlias, IdentityResolver, IdentitySourceMap};
use hostwatch_inventory::{
    InventoryResult, InventorySender, InventoryStore, SenderFactory, StoreConfig,
};
use hostwatch_types::{
    EntityKey, IdentitySource, PluginId, PluginInventoryDataset, PluginOutput, SortKey,
};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────

fn test_config(dir: &TempDir) -> AgentConfig {
    AgentConfig {
        data_dir: dir.path().to_path_buf(),
        first_reap_interval: Duration::from_secs(3600),
        reap_interval: Duration::from_secs(3600),
        send_interval: Duration::from_secs(3600),
        ..Default::default()
    }
}

fn test_context(config: AgentConfig) -> Arc<AgentContext> {
    let (sender, _rx) = ChannelEventSender::new(16);
    let events = EventPipeline::new(
        &config.event_pipeline_config(),
        Arc::new(StaticFeatureFlags::new()),
        Arc::new(sender),
    );
    let identity = Arc::new(IdentityResolver::with_sources(
        IdentitySourceMap::new().with(IdentitySource::Hostname, "test-host"),
    ));
    Arc::new(AgentContext::new(config, identity, events))
}

fn test_agent(config: AgentConfig) -> Agent {
    let store = Arc::new(InventoryStore::new(config.store_config()));
    Agent::new(test_context(config), store).unwrap()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[derive(Serialize)]
struct Item {
    name: String,
}

impl SortKey for Item {
    fn sort_key(&self) -> String {
        self.name.clone()
    }
}

/// Counts runs and reports each one on a channel.
struct CountingPlugin {
    id: PluginId,
    runs: AtomicUsize,
    ran: mpsc::UnboundedSender<PluginId>,
}

impl CountingPlugin {
    fn new(id: PluginId, ran: mpsc::UnboundedSender<PluginId>) -> Arc<Self> {
        Arc::new(Self {
            id,
            runs: AtomicUsize::new(0),
            ran,
        })
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Plugin for CountingPlugin {
    fn id(&self) -> PluginId {
        self.id.clone()
    }

    fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let _ = self.ran.send(self.id.clone());
    }

    fn kill(&self) {}
}

/// Registers itself for reconnects from inside its own run.
struct SelfReconnectingPlugin {
    ctx: Arc<AgentContext>,
    runs: AtomicUsize,
    ran: mpsc::UnboundedSender<PluginId>,
}

impl Plugin for SelfReconnectingPlugin {
    fn id(&self) -> PluginId {
        PluginId::new("reconnecting", "plugin")
    }

    fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.ctx.add_reconnecting(self.id());
        let _ = self.ran.send(self.id());
    }

    fn kill(&self) {}
}

#[derive(Default)]
struct KillingPlugin {
    kills: AtomicUsize,
    runs: AtomicUsize,
    infos: AtomicUsize,
    health_checks: AtomicUsize,
}

impl Plugin for KillingPlugin {
    fn id(&self) -> PluginId {
        PluginId::new("killing", "plugin")
    }

    fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }

    fn kill(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
    }

    fn is_external(&self) -> bool {
        true
    }

    fn external_plugin_name(&self) -> Option<String> {
        Some("nri-killing".to_string())
    }

    fn log_info(&self) {
        self.infos.fetch_add(1, Ordering::SeqCst);
    }

    fn schedule_health_check(&self) {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
    }
}

async fn expect_runs(rx: &mut mpsc::UnboundedReceiver<PluginId>, count: usize) -> Vec<PluginId> {
    let mut ids = Vec::new();
    for _ in 0..count {
        let id = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("plugin did not run in time")
            .expect("run channel closed");
        ids.push(id);
    }
    ids
}

// ── Plugin lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn reconnecting_plugins_run_again_after_reconnect() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let non_reconnecting = CountingPlugin::new(PluginId::new("test", "nonreconnecting"), tx.clone());
    let reconnecting = CountingPlugin::new(PluginId::new("test", "reconnecting"), tx);
    agent.context().add_reconnecting(reconnecting.id());
    agent.register_plugin(non_reconnecting.clone());
    agent.register_plugin(reconnecting.clone());

    agent.start_plugins();
    expect_runs(&mut rx, 2).await;

    agent.context().reconnect();
    let rerun = expect_runs(&mut rx, 1).await;
    assert_eq!(rerun, vec![reconnecting.id()]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(non_reconnecting.runs(), 1);
    assert_eq!(reconnecting.runs(), 2);
}

#[tokio::test]
async fn plugin_registering_itself_during_run_reruns_after_reconnect() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let one_shot = CountingPlugin::new(PluginId::new("non-reconnecting", "plugin"), tx.clone());
    let reconnecting = Arc::new(SelfReconnectingPlugin {
        ctx: Arc::clone(agent.context()),
        runs: AtomicUsize::new(0),
        ran: tx,
    });
    agent.register_plugin(one_shot.clone());
    agent.register_plugin(reconnecting.clone());

    agent.start_plugins();
    expect_runs(&mut rx, 2).await;
    assert!(agent.context().is_reconnecting(&reconnecting.id()));
    assert!(!agent.context().is_reconnecting(&one_shot.id()));

    agent.context().reconnect();
    let rerun = expect_runs(&mut rx, 1).await;
    assert_eq!(rerun, vec![reconnecting.id()]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reconnecting.runs.load(Ordering::SeqCst), 2);
    assert_eq!(one_shot.runs(), 1);
}

#[tokio::test]
async fn burst_of_reconnects_reruns_once_per_signal() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let one_shot = CountingPlugin::new(PluginId::new("test", "oneshot"), tx.clone());
    let reconnecting = CountingPlugin::new(PluginId::new("test", "reconnecting"), tx);
    agent.context().add_reconnecting(reconnecting.id());
    agent.register_plugin(one_shot.clone());
    agent.register_plugin(reconnecting.clone());

    agent.start_plugins();
    expect_runs(&mut rx, 2).await;

    // Sent without yielding, so the listener falls behind the channel.
    for _ in 0..40 {
        agent.context().reconnect();
    }
    let reruns = expect_runs(&mut rx, 40).await;
    assert!(reruns.iter().all(|id| *id == reconnecting.id()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reconnecting.runs(), 41);
    assert_eq!(one_shot.runs(), 1);
}

#[tokio::test]
async fn start_plugins_logs_info_and_schedules_health_checks_once() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let plugin = Arc::new(KillingPlugin::default());
    agent.register_plugin(plugin.clone());

    assert!(agent.plugins()[0].is_external());
    assert_eq!(agent.plugins()[0].external_plugin_name().as_deref(), Some("nri-killing"));

    agent.start_plugins();
    let runs = Arc::clone(&plugin);
    wait_until(move || runs.runs.load(Ordering::SeqCst) == 1).await;

    agent.context().add_reconnecting(plugin.id());
    agent.context().reconnect();
    let reruns = Arc::clone(&plugin);
    wait_until(move || reruns.runs.load(Ordering::SeqCst) == 2).await;

    assert_eq!(plugin.infos.load(Ordering::SeqCst), 1);
    assert_eq!(plugin.health_checks.load(Ordering::SeqCst), 1);
    assert_eq!(plugin.kills.load(Ordering::SeqCst), 0);
}

#[test]
fn built_in_plugins_have_no_external_name() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let plugin = CountingPlugin::new(PluginId::new("test", "builtin"), tx);
    assert!(!plugin.is_external());
    assert_eq!(plugin.external_plugin_name(), None);
}

#[tokio::test]
async fn every_plugin_sharing_a_reconnecting_id_reruns() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let id = PluginId::new("test", "shared");
    let first = CountingPlugin::new(id.clone(), tx.clone());
    let second = CountingPlugin::new(id.clone(), tx);
    agent.context().add_reconnecting(id);
    agent.register_plugin(first.clone());
    agent.register_plugin(second.clone());

    agent.start_plugins();
    expect_runs(&mut rx, 2).await;
    agent.context().reconnect();
    agent.context().reconnect();
    expect_runs(&mut rx, 4).await;

    assert_eq!(first.runs(), 3);
    assert_eq!(second.runs(), 3);
}

#[tokio::test]
async fn terminate_kills_every_plugin_once() {
    let dir = TempDir::new().unwrap();
    let mut agent = test_agent(test_config(&dir));
    let plugins: Vec<Arc<KillingPlugin>> = (0..3).map(|_| Arc::new(KillingPlugin::default())).collect();
    for plugin in &plugins {
        agent.register_plugin(plugin.clone());
    }

    agent.terminate();
    agent.terminate();

    assert_eq!(agent.plugins().len(), 3);
    for plugin in &plugins {
        assert_eq!(plugin.kills.load(Ordering::SeqCst), 1);
    }
}

// ── Main loop ───────────────────────────────────────────────────

#[tokio::test]
async fn cancel_fn_stops_the_loop() {
    let dir = TempDir::new().unwrap();
    let agent = Arc::new(test_agent(test_config(&dir)));
    let cancel = agent.context().cancel_fn();

    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("run did not stop")
        .unwrap();
    assert!(result.is_ok());

    assert!(matches!(agent.run().await, Err(AgentError::AlreadyRunning)));
    let late = PluginOutput::new(PluginId::new("test", "plugin"), EntityKey::from("x"), Vec::new());
    assert!(matches!(agent.context().send_data(late), Err(AgentError::ChannelClosed)));
}

#[tokio::test]
async fn plugin_output_is_stored() {
    let dir = TempDir::new().unwrap();
    let agent = Arc::new(test_agent(test_config(&dir)));
    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });

    let data: PluginInventoryDataset = vec![Box::new(Item { name: "sshd".into() })];
    agent
        .context()
        .send_data(PluginOutput::new(
            PluginId::new("test", "plugin"),
            EntityKey::from("someEntity"),
            data,
        ))
        .unwrap();

    let path = dir.path().join("test").join("someEntity").join("plugin.json");
    wait_until(|| path.is_file()).await;
    assert!(agent.store().is_registered(&EntityKey::from("someEntity")));

    agent.context().cancel_fn()();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn output_without_entity_is_stored_under_the_agent_key() {
    let dir = TempDir::new().unwrap();
    let agent = Arc::new(test_agent(test_config(&dir)));
    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });

    let data: PluginInventoryDataset = vec![Box::new(Item { name: "kernel".into() })];
    agent
        .context()
        .send_data(PluginOutput::new(PluginId::new("system", "info"), EntityKey::new(""), data))
        .unwrap();

    let path = dir.path().join("system").join("test-host").join("info.json");
    wait_until(|| path.is_file()).await;

    agent.context().cancel_fn()();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn host_aliases_update_the_entity_key() {
    let dir = TempDir::new().unwrap();
    let agent = Arc::new(test_agent(test_config(&dir)));
    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });

    let aliases: PluginInventoryDataset = vec![
        Box::new(HostAlias::new(IdentitySource::InstanceId, "i-0123456789")),
        Box::new(HostAlias::new(IdentitySource::HostnameShort, "short")),
    ];
    agent
        .context()
        .send_data(PluginOutput::new(PluginId::host_aliases(), EntityKey::new(""), aliases))
        .unwrap();

    let ctx = Arc::clone(agent.context());
    wait_until(move || ctx.entity_key() == Some(EntityKey::from("i-0123456789"))).await;
    let path = dir
        .path()
        .join("metadata")
        .join("i-0123456789")
        .join("host_aliases.json");
    wait_until(|| path.is_file()).await;

    agent.context().cancel_fn()();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn reap_removes_entities_that_did_not_report() {
    let dir = TempDir::new().unwrap();
    let config = AgentConfig {
        first_reap_interval: Duration::from_millis(50),
        ..test_config(&dir)
    };
    let agent = Arc::new(test_agent(config));
    let store = Arc::clone(agent.store());

    let data = || -> PluginInventoryDataset { vec![Box::new(Item { name: "x".into() })] };
    let plugin = PluginId::new("test", "plugin");
    store.store(&plugin, &EntityKey::from("stale:entity"), &data()).unwrap();
    store.store(&plugin, &EntityKey::from("test-host"), &data()).unwrap();

    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });
    agent
        .context()
        .send_data(PluginOutput::new(plugin.clone(), EntityKey::from("remote:entity"), data()))
        .unwrap();

    let reaped = Arc::clone(&store);
    wait_until(move || !reaped.is_registered(&EntityKey::from("stale:entity"))).await;

    assert!(store.is_registered(&EntityKey::from("test-host")));
    assert!(store.is_registered(&EntityKey::from("remote:entity")));
    assert!(!dir.path().join("test").join("staleentity").exists());
    assert!(dir.path().join("test").join("test-host").join("plugin.json").is_file());

    agent.context().cancel_fn()();
    handle.await.unwrap().unwrap();
}

// ── Forward-only mode ───────────────────────────────────────────

struct CountingSender(Arc<AtomicUsize>);

#[async_trait]
impl InventorySender for CountingSender {
    async fn process(&self) -> InventoryResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn sender_calls_with_forward_only(forward_only: bool) -> usize {
    let dir = TempDir::new().unwrap();
    let config = AgentConfig {
        is_forward_only: forward_only,
        first_reap_interval: Duration::from_secs(1),
        send_interval: Duration::from_micros(5),
        ..test_config(&dir)
    };

    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = Arc::clone(&calls);
    let factory: SenderFactory = Arc::new(move |_: &EntityKey| {
        Arc::new(CountingSender(Arc::clone(&factory_calls))) as Arc<dyn InventorySender>
    });
    let store = Arc::new(InventoryStore::with_sender_factory(
        StoreConfig::new(dir.path()),
        factory,
    ));
    store.register_entity_inventory(&EntityKey::from("test"));

    let agent = Arc::new(Agent::new(test_context(config), store).unwrap());
    let cancel = agent.context().cancel_fn();
    let running = Arc::clone(&agent);
    let handle = tokio::spawn(async move { running.run().await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel();
    handle.await.unwrap().unwrap();

    calls.load(Ordering::SeqCst)
}

#[tokio::test]
async fn forward_only_never_sends_inventory() {
    assert_eq!(sender_calls_with_forward_only(true).await, 0);
}

#[tokio::test]
async fn inventory_is_sent_when_not_forward_only() {
    assert!(sender_calls_with_forward_only(false).await >= 1);
}

// ── Bootstrap ───────────────────────────────────────────────────

struct FailingProbe(AtomicUsize);

#[async_trait]
impl ReachabilityProbe for FailingProbe {
    async fn probe(&self) -> ConnectResult<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(ConnectError::Probe("connection refused".into()))
    }
}

struct ReachableProbe;

#[async_trait]
impl ReachabilityProbe for ReachableProbe {
    async fn probe(&self) -> ConnectResult<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn bootstrap_fails_when_collector_is_unreachable() {
    let dir = TempDir::new().unwrap();
    let config = AgentConfig {
        startup_connection_retries: 2,
        startup_connection_timeout: Duration::from_millis(10),
        ..test_config(&dir)
    };
    let store = Arc::new(InventoryStore::new(config.store_config()));
    let probe = FailingProbe(AtomicUsize::new(0));

    let result = Agent::bootstrap(test_context(config), store, &probe).await;
    assert!(matches!(
        result,
        Err(AgentError::Connect(ConnectError::ConnectionFailed { attempts: 3, .. }))
    ));
    assert_eq!(probe.0.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_succeeds_when_collector_answers() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let store = Arc::new(InventoryStore::new(config.store_config()));

    let agent = Agent::bootstrap(test_context(config), store, &ReachableProbe)
        .await
        .unwrap();
    assert!(agent.plugins().is_empty());
}

#[tokio::test]
async fn bootstrap_http_probes_the_collector_url() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = AgentConfig {
        collector_url: server.uri(),
        startup_connection_retries: 0,
        ..test_config(&dir)
    };
    let store = Arc::new(InventoryStore::new(config.store_config()));

    Agent::bootstrap_http(test_context(config), store, "hostwatch-test")
        .await
        .unwrap();
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = AgentConfig {
        send_interval: Duration::ZERO,
        ..test_config(&dir)
    };
    let store = Arc::new(InventoryStore::new(config.store_config()));
    let result = Agent::new(test_context(config), store);
    assert!(matches!(result, Err(AgentError::Config(_))));
}
