use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bot_service::{CoreDeps, DeviceCore, PollingConfig, ServiceConfig, SystemClock};
use bot_storage::{DataLayout, DeviceConfig, KeyMaterial};
use bot_transport::{BackendConfig, ENVELOPE_HEADER, HttpsTransport, TcpProbe};
use bot_types::DeviceState;
use botd::build_router;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICE_KEY: &str = include_str!("fixtures/device_key.pem");

fn envelope_body(bot: Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(ENVELOPE_HEADER),
        URL_SAFE_NO_PAD.encode(json!({ "bot": bot }).to_string())
    )
}

async fn respond(server: &MockServer, verb: &str, route: &str, bot: Value) {
    Mock::given(method(verb))
        .and(path(format!("/bot_iot{route}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(envelope_body(bot)))
        .mount(server)
        .await;
}

/// A device in `state`, talking plain HTTP to `backend_port`.
async fn device(dir: &TempDir, state: DeviceState, backend_port: u16) -> Arc<DeviceCore> {
    let layout = DataLayout::new(dir.path());
    std::fs::write(layout.device_state_path(), [state.as_byte()]).unwrap();
    let keys = Arc::new(
        KeyMaterial::new(DeviceConfig::new("maker-1", "dev-1")).with_private_key(DEVICE_KEY),
    );
    let backend = BackendConfig {
        host: "127.0.0.1".to_string(),
        http_port: backend_port,
        https: false,
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let transport = Arc::new(HttpsTransport::new(backend, keys.clone()).unwrap());
    let probe = Arc::new(TcpProbe::new("127.0.0.1", backend_port, Duration::from_secs(1)));
    let quick = PollingConfig {
        max_attempts: 2,
        interval: Duration::from_millis(20),
    };
    Arc::new(DeviceCore::assemble(
        &layout,
        CoreDeps {
            keys,
            transport,
            probe,
            clock: Arc::new(SystemClock),
        },
        ServiceConfig {
            pairing: quick,
            activation: quick,
            validate_actions: false,
            ..Default::default()
        },
    ))
}

/// Spin up the control API on an OS-assigned port, returning the base URL.
async fn spawn_control_api(core: Arc<DeviceCore>) -> String {
    let app = build_router(core);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{port}")
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn trigger(base: &str, body: Value) -> (u16, String) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/actions"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body["message"].as_str().unwrap().to_string())
}

// ── Status ────────────────────────────────────────────────────────

#[tokio::test]
async fn status_reports_state_and_stats() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, unused_port()).await).await;

    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deviceID"], "dev-1");
    assert_eq!(body["makerID"], "maker-1");
    assert_eq!(body["state"], "active");
    assert_eq!(body["message"], "Device is active");
    assert_eq!(body["stats"]["pending_offline"], 0);
}

#[tokio::test]
async fn qrcode_serves_enrollment_payload() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::New, unused_port()).await).await;

    let body: Value = reqwest::get(format!("{base}/qrcode"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["deviceID"], "dev-1");
    assert_eq!(body["name"], "BoT-ESP-32");
    assert_eq!(body["multipair"], 0);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::New, unused_port()).await).await;

    let resp = reqwest::get(format!("{base}/nonexistent")).await.unwrap();

    assert_eq!(resp.status(), 404);
}

// ── Triggering ────────────────────────────────────────────────────

#[tokio::test]
async fn trigger_on_inactive_device_is_refused() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Paired, unused_port()).await).await;

    let (status, message) = trigger(&base, json!({ "actionID": "light_on" })).await;

    assert_eq!(status, 400);
    assert_eq!(message, "Device not activated (PAIRED)");
}

#[tokio::test]
async fn trigger_without_action_id_is_refused() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, unused_port()).await).await;

    let (status, message) = trigger(&base, json!({ "value": 3 })).await;

    assert_eq!(status, 400);
    assert_eq!(message, "Missing parameter `actionID`");
}

#[tokio::test]
async fn delivered_action_returns_200() {
    let server = MockServer::start().await;
    respond(&server, "POST", "/actions", json!("OK")).await;
    let port = server.address().port();
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, port).await).await;

    let (status, message) = trigger(&base, json!({ "actionID": "light_on", "value": "2.5" })).await;

    assert_eq!(status, 200);
    assert_eq!(message, "Action triggered successful");
}

#[tokio::test]
async fn unknown_action_returns_404() {
    let server = MockServer::start().await;
    respond(&server, "POST", "/actions", json!("Action not found")).await;
    let port = server.address().port();
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, port).await).await;

    let (status, message) = trigger(&base, json!({ "actionID": "ghost" })).await;

    assert_eq!(status, 404);
    assert_eq!(message, "Action not triggered as its not found");
}

#[tokio::test]
async fn unreachable_backend_queues_and_returns_201() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, unused_port()).await).await;

    let (status, _) = trigger(&base, json!({ "actionID": "light_on" })).await;

    assert_eq!(status, 201);
    assert!(DataLayout::new(dir.path()).offline_actions_path().exists());
}

// ── Actions list ──────────────────────────────────────────────────

#[tokio::test]
async fn actions_are_listed_from_backend() {
    let server = MockServer::start().await;
    respond(
        &server,
        "GET",
        "/actions",
        json!([{ "actionID": "light_on", "frequency": "always" }]),
    )
    .await;
    let port = server.address().port();
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, port).await).await;

    let resp = reqwest::get(format!("{base}/actions")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([{ "actionID": "light_on", "frequency": "always" }]));
}

#[tokio::test]
async fn actions_unavailable_returns_503() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, unused_port()).await).await;

    let resp = reqwest::get(format!("{base}/actions")).await.unwrap();
    assert_eq!(resp.status(), 503);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Unable to retrieve actions");
}

// ── Pairing ───────────────────────────────────────────────────────

#[tokio::test]
async fn pairing_an_enrolled_device_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::Active, unused_port()).await).await;

    let resp = reqwest::get(format!("{base}/pairing")).await.unwrap();

    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn pairing_a_new_device_pairs_and_activates() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/pair", json!({ "paired": true })).await;
    respond(&server, "POST", "/status", json!("")).await;
    let port = server.address().port();
    let dir = TempDir::new().unwrap();
    let core = device(&dir, DeviceState::New, port).await;
    let base = spawn_control_api(core.clone()).await;

    let resp = reqwest::get(format!("{base}/pairing")).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(core.state.get().await.unwrap(), DeviceState::Active);
}

#[tokio::test]
async fn failed_pairing_returns_503() {
    let server = MockServer::start().await;
    respond(&server, "GET", "/pair", json!({ "paired": false })).await;
    let port = server.address().port();
    let dir = TempDir::new().unwrap();
    let base = spawn_control_api(device(&dir, DeviceState::New, port).await).await;

    let resp = reqwest::get(format!("{base}/pairing")).await.unwrap();
    assert_eq!(resp.status(), 503);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Unable to pair device");
}
