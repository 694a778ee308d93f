//! Local HTTP control API for the device daemon.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use bot_service::{DeviceCore, StatsSnapshot};
use bot_types::{DeviceInfo, DeviceState};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Body of `GET /`.
#[derive(Serialize, Debug)]
pub struct StatusResponse {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "makerID")]
    pub maker_id: String,
    pub state: DeviceState,
    pub message: String,
    pub stats: StatsSnapshot,
}

/// Body of `POST /actions`.
#[derive(Deserialize, Debug, Default)]
pub struct TriggerRequest {
    #[serde(rename = "actionID", default)]
    pub action_id: String,
    /// A number, or a string holding one.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(rename = "alternativeID", default)]
    pub alternative_id: Option<String>,
}

impl TriggerRequest {
    pub fn numeric_value(&self) -> Option<f64> {
        match self.value.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (status, Json(json!({ "message": text.into() }))).into_response()
}

async fn status_handler(State(core): State<Arc<DeviceCore>>) -> Response {
    let state = match core.state.get().await {
        Ok(state) => state,
        Err(e) => {
            error!("Cannot read device state: {e}");
            return message(StatusCode::INTERNAL_SERVER_ERROR, "Device state unavailable");
        }
    };
    Json(StatusResponse {
        device_id: core.keys.device_id().to_string(),
        maker_id: core.keys.maker_id().to_string(),
        state,
        message: state.status_message().to_string(),
        stats: core.engine.stats().await,
    })
    .into_response()
}

async fn list_actions_handler(State(core): State<Arc<DeviceCore>>) -> Response {
    match core.catalog.fetch_actions().await {
        Ok(actions) => Json(actions).into_response(),
        Err(e) => {
            warn!("Unable to retrieve actions: {e}");
            message(StatusCode::SERVICE_UNAVAILABLE, "Unable to retrieve actions")
        }
    }
}

async fn trigger_action_handler(
    State(core): State<Arc<DeviceCore>>,
    Json(request): Json<TriggerRequest>,
) -> Response {
    debug!(action_id = %request.action_id, "Trigger requested");
    let outcome = core
        .engine
        .trigger_action_as(
            &request.action_id,
            request.numeric_value(),
            request.alternative_id.as_deref(),
        )
        .await;
    let status = StatusCode::from_u16(outcome.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    message(status, outcome.message())
}

async fn pairing_handler(State(core): State<Arc<DeviceCore>>) -> Response {
    match core.state.get().await {
        Ok(DeviceState::New) => {}
        Ok(_) => return message(StatusCode::FORBIDDEN, "Device is already paired"),
        Err(e) => {
            error!("Cannot read device state: {e}");
            return message(StatusCode::SERVICE_UNAVAILABLE, "Unable to pair device");
        }
    }

    if let Err(e) = core.pairing.pair_device().await {
        error!("Pairing failed: {e}");
        return message(StatusCode::SERVICE_UNAVAILABLE, "Unable to pair device");
    }
    match core.state.get().await {
        Ok(state) if state != DeviceState::New => {
            message(StatusCode::OK, "Device pairing successful")
        }
        _ => message(StatusCode::SERVICE_UNAVAILABLE, "Unable to pair device"),
    }
}

/// The enrollment payload a companion app scans.
async fn qrcode_handler(State(core): State<Arc<DeviceCore>>) -> Json<DeviceInfo> {
    Json(core.orchestrator.device_info())
}

/// Build the control API router for a device.
pub fn build_router(core: Arc<DeviceCore>) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route(
            "/actions",
            get(list_actions_handler).post(trigger_action_handler),
        )
        .route("/pairing", get(pairing_handler))
        .route("/qrcode", get(qrcode_handler))
        .with_state(core)
}
