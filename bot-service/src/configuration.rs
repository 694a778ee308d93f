//! Sequences enrollment: initialize, then pair and activate as needed.

use crate::activation::{ActivationCoordinator, ActivationOutcome};
use crate::error::ServiceResult;
use crate::pairing::{PairingCoordinator, PairingOutcome, is_paired_response};
use bot_storage::{DeviceStateStore, KeyMaterialStore};
use bot_types::{DeviceInfo, DeviceState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shows the enrollment payload to the user, typically as a QR code.
pub trait EnrollmentPresenter: Send + Sync {
    /// `payload` is the compact JSON form of `info`.
    fn present(&self, info: &DeviceInfo, payload: &str);
}

/// Writes the enrollment payload to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl EnrollmentPresenter for LogPresenter {
    fn present(&self, info: &DeviceInfo, payload: &str) {
        info!(device_id = %info.device_id, "Enrollment payload: {payload}");
    }
}

/// What `configure_device` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Pairing(PairingOutcome),
    Activation(ActivationOutcome),
    /// Already `Active` or `Multipair`; nothing to do.
    AlreadyEnrolled(DeviceState),
}

/// Drives a device from NEW to its terminal state.
pub struct ConfigurationOrchestrator {
    keys: Arc<dyn KeyMaterialStore>,
    state: Arc<DeviceStateStore>,
    pairing: Arc<PairingCoordinator>,
    activation: Arc<ActivationCoordinator>,
    presenter: Arc<dyn EnrollmentPresenter>,
}

impl ConfigurationOrchestrator {
    pub fn new(
        keys: Arc<dyn KeyMaterialStore>,
        state: Arc<DeviceStateStore>,
        pairing: Arc<PairingCoordinator>,
        activation: Arc<ActivationCoordinator>,
    ) -> Self {
        Self {
            keys,
            state,
            pairing,
            activation,
            presenter: Arc::new(LogPresenter),
        }
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: Arc<dyn EnrollmentPresenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// The device info document for this identity.
    pub fn device_info(&self) -> DeviceInfo {
        self.keys.device_info()
    }

    /// Provisions the state for the configured pairing mode and presents the
    /// enrollment payload.
    ///
    /// A stored state that already belongs to the configured mode is kept, so
    /// a device resumed after power loss continues where it stopped.
    pub async fn initialize(&self) -> ServiceResult<DeviceInfo> {
        let mode = self.keys.pairing_mode();
        let stored = match self.state.get().await {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Stored device state unreadable, starting over: {e}");
                None
            }
        };

        match stored {
            Some(state) if mode.is_consistent_with(state) => {
                debug!(%state, "Keeping stored device state");
            }
            _ => {
                let initial = mode.initial_state();
                self.state.set(initial).await?;
                info!(state = %initial, "Device state initialized");
            }
        }

        let info = self.device_info();
        let payload = info.to_json()?;
        self.presenter.present(&info, &payload);
        Ok(info)
    }

    /// Runs the step the current state calls for. Safe to call repeatedly.
    pub async fn configure_device(&self) -> ServiceResult<ConfigureOutcome> {
        let state = self.state.get().await?;
        match state {
            DeviceState::New => {
                info!("Device not paired yet, starting pairing");
                Ok(ConfigureOutcome::Pairing(self.pairing.pair_device().await?))
            }
            DeviceState::Paired => {
                info!("Device paired but not activated, starting activation");
                Ok(ConfigureOutcome::Activation(
                    self.activation.activate_device().await?,
                ))
            }
            DeviceState::Active | DeviceState::Multipair => {
                debug!(%state, "Device already enrolled");
                Ok(ConfigureOutcome::AlreadyEnrolled(state))
            }
        }
    }

    /// Full enrollment. Returns true once the device sits in the terminal
    /// state for its pairing mode.
    ///
    /// A device the backend already knows as paired keeps its stored state
    /// unless that state belongs to the other pairing mode, in which case it
    /// is reset and initialized from scratch. Any other device is initialized
    /// first.
    pub async fn pair_and_activate(&self) -> ServiceResult<bool> {
        let paired = match self.pairing.pairing_status().await {
            Ok(response) => is_paired_response(&response),
            Err(e) => {
                warn!("Pairing status unavailable: {e}");
                false
            }
        };

        let mode = self.keys.pairing_mode();
        if paired {
            let consistent = match self.state.get().await {
                Ok(state) => mode.is_consistent_with(state),
                Err(_) => false,
            };
            if consistent {
                debug!("Device already paired with a valid state");
            } else {
                info!("Stored state does not match pairing mode, reinitializing");
                self.state.reset().await?;
                self.initialize().await?;
            }
        } else {
            info!("Device not paired yet, initializing");
            self.initialize().await?;
        }

        self.configure_device().await?;

        let state = self.state.get().await?;
        let done = state == mode.terminal_state();
        if done {
            info!(%state, "Device enrolled");
        } else {
            warn!(%state, "Device enrollment incomplete");
        }
        Ok(done)
    }
}
