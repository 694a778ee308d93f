//! Backend-initiated actions.
//!
//! The backend can queue actions for a device, for example a payment a
//! customer approved in the companion app. The device fetches them and
//! triggers each one on behalf of the customer it names.

use crate::actions::{ActionDeliveryEngine, DeliveryOutcome};
use crate::error::{ServiceError, ServiceResult};
use bot_transport::{BackendTransport, Endpoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// One queued backend message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "actionID")]
    pub action_id: String,
    /// The identity the action is triggered for.
    #[serde(rename = "customerID", default)]
    pub customer_id: String,
    #[serde(rename = "deviceID", default)]
    pub device_id: String,
    #[serde(default)]
    pub event: String,
}

/// Polls the backend message queue and dispatches each message.
pub struct MessagesService {
    transport: Arc<dyn BackendTransport>,
    engine: Arc<ActionDeliveryEngine>,
}

impl MessagesService {
    pub fn new(transport: Arc<dyn BackendTransport>, engine: Arc<ActionDeliveryEngine>) -> Self {
        Self { transport, engine }
    }

    /// Fetches pending messages. An empty response means none.
    pub async fn fetch_messages(&self) -> ServiceResult<Vec<Message>> {
        let response = self.transport.get(Endpoint::Messages).await?;
        if response.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&response).map_err(ServiceError::from)
    }

    /// Fetches messages and triggers one action per message, in order.
    pub async fn fetch_and_dispatch(&self) -> ServiceResult<Vec<(Message, DeliveryOutcome)>> {
        let messages = self.fetch_messages().await?;
        if messages.is_empty() {
            debug!("No backend messages");
            return Ok(Vec::new());
        }
        info!(count = messages.len(), "Processing backend messages");

        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            let alternate = Some(message.customer_id.as_str()).filter(|c| !c.is_empty());
            let outcome = self
                .engine
                .trigger_action_as(&message.action_id, None, alternate)
                .await;
            info!(
                action_id = %message.action_id,
                event = %message.event,
                status = outcome.http_status(),
                "Message dispatched"
            );
            results.push((message, outcome));
        }
        Ok(results)
    }
}
