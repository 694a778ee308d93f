//! PAIRED → ACTIVE.

use crate::config::PollingConfig;
use crate::error::ServiceResult;
use crate::polling::{PollOutcome, poll_until};
use bot_storage::{DeviceStateStore, KeyMaterialStore};
use bot_transport::{BackendTransport, Endpoint};
use bot_types::DeviceState;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of an activation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Activated { attempts: u32 },
    NotActivated { attempts: u32 },
}

impl ActivationOutcome {
    pub fn is_activated(self) -> bool {
        matches!(self, ActivationOutcome::Activated { .. })
    }
}

/// Polls the backend until it reports the device as activated.
///
/// The backend signals activation with an *empty* logical response; any
/// content, including an error, means not yet.
pub struct ActivationCoordinator {
    transport: Arc<dyn BackendTransport>,
    state: Arc<DeviceStateStore>,
    keys: Arc<dyn KeyMaterialStore>,
    config: PollingConfig,
}

impl ActivationCoordinator {
    pub fn new(
        transport: Arc<dyn BackendTransport>,
        state: Arc<DeviceStateStore>,
        keys: Arc<dyn KeyMaterialStore>,
        config: PollingConfig,
    ) -> Self {
        Self {
            transport,
            state,
            keys,
            config,
        }
    }

    /// One activation status request. Returns true if the device is active.
    async fn check_activation(&self) -> bool {
        let payload = json!({ "bot": { "deviceID": self.keys.device_id() } });
        match self.transport.post(Endpoint::Activation, &payload).await {
            Ok(response) if response.is_empty() => true,
            Ok(response) => {
                debug!(%response, "Activation pending");
                false
            }
            Err(e) => {
                warn!("Activation status request failed: {e}");
                false
            }
        }
    }

    /// Polls activation status without touching the device state.
    pub async fn poll_activation_status(&self) -> PollOutcome {
        poll_until(self.config, "activation status", |_| self.check_activation()).await
    }

    /// Polls and commits `Active` on success.
    pub async fn activate_device(&self) -> ServiceResult<ActivationOutcome> {
        match self.poll_activation_status().await {
            PollOutcome::Succeeded { attempts } => {
                self.state.set(DeviceState::Active).await?;
                info!(attempts, "Device activated, action triggering enabled");
                Ok(ActivationOutcome::Activated { attempts })
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(attempts, "Device not activated yet, try again later");
                Ok(ActivationOutcome::NotActivated { attempts })
            }
        }
    }
}
