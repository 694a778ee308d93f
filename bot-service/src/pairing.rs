//! NEW → PAIRED, then straight into activation.

use crate::activation::{ActivationCoordinator, ActivationOutcome};
use crate::config::PollingConfig;
use crate::error::ServiceResult;
use crate::polling::{PollOutcome, poll_until};
use bot_storage::DeviceStateStore;
use bot_transport::{BackendTransport, Endpoint, TransportResult};
use bot_types::DeviceState;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a pairing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Paired; activation ran right after.
    Paired {
        attempts: u32,
        activation: ActivationOutcome,
    },
    /// Polling exhausted without the backend confirming the pairing.
    NotPaired { attempts: u32 },
    /// Multipair devices skip pairing.
    SkippedMultipair,
    /// The device is already past pairing.
    NotPairable(DeviceState),
}

/// Returns true if a pairing response carries a truthy flag.
///
/// JSON responses are inspected structurally: `true`, `"true"`, or an object
/// with any top-level `true` field. Anything else falls back to a substring
/// match.
pub fn is_paired_response(response: &str) -> bool {
    match serde_json::from_str::<Value>(response) {
        Ok(Value::Bool(b)) => b,
        Ok(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        Ok(Value::Object(map)) => map.values().any(|v| *v == Value::Bool(true)),
        Ok(_) => false,
        Err(_) => response.contains("true"),
    }
}

/// Polls the backend until the companion app has paired this device.
pub struct PairingCoordinator {
    transport: Arc<dyn BackendTransport>,
    state: Arc<DeviceStateStore>,
    activation: Arc<ActivationCoordinator>,
    config: PollingConfig,
}

impl PairingCoordinator {
    pub fn new(
        transport: Arc<dyn BackendTransport>,
        state: Arc<DeviceStateStore>,
        activation: Arc<ActivationCoordinator>,
        config: PollingConfig,
    ) -> Self {
        Self {
            transport,
            state,
            activation,
            config,
        }
    }

    /// Only `New` and `Multipair` devices may enter pairing.
    pub async fn is_pairable(&self) -> ServiceResult<bool> {
        Ok(self.state.get().await?.is_pairable())
    }

    /// A single pairing status request.
    pub async fn pairing_status(&self) -> TransportResult<String> {
        self.transport.get(Endpoint::Pairing).await
    }

    async fn check_paired(&self) -> bool {
        match self.pairing_status().await {
            Ok(response) => {
                debug!(%response, "Pairing status");
                is_paired_response(&response)
            }
            Err(e) => {
                warn!("Pairing status request failed: {e}");
                false
            }
        }
    }

    /// Polls pairing status. Returns `None` if the device is not pairable.
    pub async fn poll_pairing_status(&self) -> ServiceResult<Option<PollOutcome>> {
        if !self.is_pairable().await? {
            return Ok(None);
        }
        info!("Polling backend for pairing status");
        Ok(Some(
            poll_until(self.config, "pairing status", |_| self.check_paired()).await,
        ))
    }

    /// Runs the pairing flow and, on success, activation.
    pub async fn pair_device(&self) -> ServiceResult<PairingOutcome> {
        let state = self.state.get().await?;
        if !state.is_pairable() {
            debug!(%state, "Device not pairable");
            return Ok(PairingOutcome::NotPairable(state));
        }
        if state == DeviceState::Multipair {
            info!("Multipair device, pairing not required");
            return Ok(PairingOutcome::SkippedMultipair);
        }

        let Some(outcome) = self.poll_pairing_status().await? else {
            return Ok(PairingOutcome::NotPairable(self.state.get().await?));
        };
        match outcome {
            PollOutcome::Succeeded { attempts } => {
                // The state may have moved while polling.
                let state = self.state.get().await?;
                if !state.is_pairable() {
                    return Ok(PairingOutcome::NotPairable(state));
                }
                self.state.set(DeviceState::Paired).await?;
                info!(attempts, "Device paired, starting activation");
                let activation = self.activation.activate_device().await?;
                Ok(PairingOutcome::Paired {
                    attempts,
                    activation,
                })
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(attempts, "Device pairing not completed, try again");
                Ok(PairingOutcome::NotPaired { attempts })
            }
        }
    }
}
