#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bot_storage::{DeviceConfig, KeyMaterial};
use bot_transport::{BackendConfig, ENVELOPE_HEADER};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const DEVICE_KEY: &str = include_str!("../fixtures/device_key.pem");
pub const DEVICE_PUB: &str = include_str!("../fixtures/device_pub.pem");
pub const CA_CERT: &str = include_str!("../fixtures/ca_cert.pem");

pub const MAKER_ID: &str = "maker-1";
pub const DEVICE_ID: &str = "dev-1";

pub fn device_config() -> DeviceConfig {
    DeviceConfig::new(MAKER_ID, DEVICE_ID)
}

pub fn keys() -> Arc<KeyMaterial> {
    Arc::new(
        KeyMaterial::new(device_config())
            .with_private_key(DEVICE_KEY)
            .with_public_key(DEVICE_PUB),
    )
}

/// Plain HTTP against the mock server.
pub fn plaintext_config(server: &MockServer) -> BackendConfig {
    BackendConfig {
        host: "127.0.0.1".to_string(),
        http_port: server.address().port(),
        https: false,
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// A 200 body as the backend encodes it.
pub fn envelope_body(bot: Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(ENVELOPE_HEADER),
        URL_SAFE_NO_PAD.encode(json!({ "bot": bot }).to_string())
    )
}
