#![allow(dead_code)]

use async_trait::async_trait;
use bot_service::{
    ActionCatalog, ActionDeliveryEngine, EngineConfig, EngineDeps, PollingConfig, ServiceResult,
    TimeSource,
};
use bot_storage::{DataLayout, DeviceConfig, DeviceStateStore, KeyMaterial, OfflineQueue};
use bot_transport::{
    BackendTransport, ConnectivityProbe, Endpoint, Method, TransportError, TransportResult,
};
use bot_types::{DeviceState, OfflineActionRecord, QueueId};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const DEVICE_KEY: &str = include_str!("../fixtures/device_key.pem");
pub const MAKER_ID: &str = "maker-1";
pub const DEVICE_ID: &str = "dev-1";
pub const NOW: u64 = 1_700_000_000;

// ── Scripted transport ────────────────────────────────────────────

/// What the mock backend answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Status(u16),
    Offline,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Ok(body.into())
    }

    fn into_result(self) -> TransportResult<String> {
        match self {
            Reply::Ok(body) => Ok(body),
            Reply::Status(status) => Err(TransportError::HttpStatus(status)),
            Reply::Offline => Err(TransportError::NoConnectivity("scripted".into())),
        }
    }
}

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub endpoint: Endpoint,
    pub payload: Option<Value>,
}

type Route = (Method, Endpoint);

/// Answers each route from a queue of replies, then from a fallback.
/// Unscripted routes behave as if the backend were unreachable.
#[derive(Default)]
pub struct MockTransport {
    scripts: Mutex<HashMap<Route, VecDeque<Reply>>>,
    fallback: Mutex<HashMap<Route, Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues replies for a route, consumed in order.
    pub fn script(
        &self,
        method: Method,
        endpoint: Endpoint,
        replies: impl IntoIterator<Item = Reply>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .entry((method, endpoint))
            .or_default()
            .extend(replies);
    }

    /// Reply used once the script for a route runs out.
    pub fn always(&self, method: Method, endpoint: Endpoint, reply: Reply) {
        self.fallback
            .lock()
            .unwrap()
            .insert((method, endpoint), reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }

    /// `queueID`s of every POST to `/actions`, in order.
    pub fn posted_queue_ids(&self) -> Vec<String> {
        self.posted_actions()
            .into_iter()
            .filter_map(|p| p["bot"]["queueID"].as_str().map(str::to_string))
            .collect()
    }

    /// Payloads of every POST to `/actions`, in order.
    pub fn posted_actions(&self) -> Vec<Value> {
        self.calls_to(Endpoint::Actions)
            .into_iter()
            .filter(|c| c.method == Method::Post)
            .filter_map(|c| c.payload)
            .collect()
    }
}

#[async_trait]
impl BackendTransport for MockTransport {
    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        payload: Option<&Value>,
    ) -> TransportResult<String> {
        self.calls.lock().unwrap().push(Call {
            method,
            endpoint,
            payload: payload.cloned(),
        });
        let route = (method, endpoint);
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        let reply = scripted
            .or_else(|| self.fallback.lock().unwrap().get(&route).cloned())
            .unwrap_or(Reply::Offline);
        reply.into_result()
    }
}

// ── Connectivity and time ─────────────────────────────────────────

/// Answers from a script of reachability results, then from a default.
pub struct MockProbe {
    script: Mutex<VecDeque<bool>>,
    default: bool,
    probes: AtomicUsize,
}

impl MockProbe {
    pub fn online() -> Arc<Self> {
        Self::scripted([], true)
    }

    pub fn offline() -> Arc<Self> {
        Self::scripted([], false)
    }

    pub fn scripted(script: impl IntoIterator<Item = bool>, default: bool) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            default,
            probes: AtomicUsize::new(0),
        })
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for MockProbe {
    async fn is_reachable(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default)
    }
}

pub struct FixedClock(pub u64);

#[async_trait]
impl TimeSource for FixedClock {
    async fn now_epoch_seconds(&self) -> ServiceResult<u64> {
        Ok(self.0)
    }
}

// ── Device fixture ────────────────────────────────────────────────

pub fn single_keys() -> Arc<KeyMaterial> {
    Arc::new(KeyMaterial::new(DeviceConfig::new(MAKER_ID, DEVICE_ID)).with_private_key(DEVICE_KEY))
}

pub fn multipair_keys(alternate_id: Option<&str>) -> Arc<KeyMaterial> {
    let mut config = DeviceConfig::new(MAKER_ID, DEVICE_ID);
    config.multipair = true;
    config.alt_device_id = alternate_id.map(str::to_string);
    Arc::new(KeyMaterial::new(config).with_private_key(DEVICE_KEY))
}

/// Polling with the production interval; tests run with paused time.
pub fn polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        max_attempts,
        interval: Duration::from_secs(10),
    }
}

/// A temp data directory with a state store and queue.
pub struct Device {
    pub dir: TempDir,
    pub layout: DataLayout,
    pub keys: Arc<KeyMaterial>,
    pub state: Arc<DeviceStateStore>,
    pub queue: OfflineQueue,
}

impl Device {
    pub async fn new(keys: Arc<KeyMaterial>, state: DeviceState) -> Self {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        let store = Arc::new(DeviceStateStore::new(layout.device_state_path()));
        store.set(state).await.unwrap();
        let queue = OfflineQueue::new(layout.offline_actions_path());
        Self {
            dir,
            layout,
            keys,
            state: store,
            queue,
        }
    }

    pub async fn active() -> Self {
        Self::new(single_keys(), DeviceState::Active).await
    }

    pub fn engine(
        &self,
        transport: Arc<MockTransport>,
        probe: Arc<MockProbe>,
    ) -> ActionDeliveryEngine {
        self.engine_with(transport, probe, EngineConfig::default())
    }

    pub fn engine_with(
        &self,
        transport: Arc<MockTransport>,
        probe: Arc<MockProbe>,
        config: EngineConfig,
    ) -> ActionDeliveryEngine {
        self.spawn_engine(transport, probe, config, None)
    }

    /// An engine that checks every action against `catalog`.
    pub fn validating_engine(
        &self,
        transport: Arc<MockTransport>,
        probe: Arc<MockProbe>,
        catalog: Arc<ActionCatalog>,
    ) -> ActionDeliveryEngine {
        self.spawn_engine(transport, probe, EngineConfig::default(), Some(catalog))
    }

    fn spawn_engine(
        &self,
        transport: Arc<MockTransport>,
        probe: Arc<MockProbe>,
        config: EngineConfig,
        catalog: Option<Arc<ActionCatalog>>,
    ) -> ActionDeliveryEngine {
        ActionDeliveryEngine::spawn(
            EngineDeps {
                transport,
                probe,
                clock: Arc::new(FixedClock(NOW)),
                state: Arc::clone(&self.state),
                keys: self.keys.clone(),
                queue: self.queue.clone(),
                catalog,
            },
            config,
        )
    }

    pub fn queue_exists(&self) -> bool {
        self.layout.offline_actions_path().exists()
    }
}

pub fn pending_record(action_id: &str, timestamp: u64) -> OfflineActionRecord {
    OfflineActionRecord {
        offline: true,
        device_id: DEVICE_ID.to_string(),
        maker_id: MAKER_ID.to_string(),
        action_id: action_id.to_string(),
        queue_id: QueueId::new(),
        multipair: false,
        alternate_id: None,
        value: None,
        timestamp,
    }
}
