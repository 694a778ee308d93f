//! Wires the services for one device data directory.

use crate::actions::{ActionDeliveryEngine, EngineDeps};
use crate::activation::ActivationCoordinator;
use crate::catalog::ActionCatalog;
use crate::clock::TimeSource;
use crate::config::ServiceConfig;
use crate::configuration::ConfigurationOrchestrator;
use crate::messages::MessagesService;
use crate::pairing::PairingCoordinator;
use bot_storage::{ActionCache, DataLayout, DeviceStateStore, KeyMaterialStore, OfflineQueue};
use bot_transport::{BackendTransport, ConnectivityProbe};
use std::sync::Arc;

/// External collaborators a device core is built on.
pub struct CoreDeps {
    pub keys: Arc<dyn KeyMaterialStore>,
    pub transport: Arc<dyn BackendTransport>,
    pub probe: Arc<dyn ConnectivityProbe>,
    pub clock: Arc<dyn TimeSource>,
}

/// Every service of one device, sharing state and transport.
pub struct DeviceCore {
    pub keys: Arc<dyn KeyMaterialStore>,
    pub state: Arc<DeviceStateStore>,
    pub transport: Arc<dyn BackendTransport>,
    pub catalog: Arc<ActionCatalog>,
    pub activation: Arc<ActivationCoordinator>,
    pub pairing: Arc<PairingCoordinator>,
    pub orchestrator: Arc<ConfigurationOrchestrator>,
    pub engine: Arc<ActionDeliveryEngine>,
    pub messages: Arc<MessagesService>,
}

impl DeviceCore {
    /// Builds the services and starts the delivery worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn assemble(layout: &DataLayout, deps: CoreDeps, config: ServiceConfig) -> Self {
        let CoreDeps {
            keys,
            transport,
            probe,
            clock,
        } = deps;

        let state = Arc::new(DeviceStateStore::new(layout.device_state_path()));
        let catalog = Arc::new(ActionCatalog::new(
            Arc::clone(&transport),
            ActionCache::new(layout.actions_path()),
        ));
        let activation = Arc::new(ActivationCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&state),
            Arc::clone(&keys),
            config.activation,
        ));
        let pairing = Arc::new(PairingCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&state),
            Arc::clone(&activation),
            config.pairing,
        ));
        let orchestrator = Arc::new(ConfigurationOrchestrator::new(
            Arc::clone(&keys),
            Arc::clone(&state),
            Arc::clone(&pairing),
            Arc::clone(&activation),
        ));

        let engine = Arc::new(ActionDeliveryEngine::spawn(
            EngineDeps {
                transport: Arc::clone(&transport),
                probe,
                clock,
                state: Arc::clone(&state),
                keys: Arc::clone(&keys),
                queue: OfflineQueue::new(layout.offline_actions_path()),
                catalog: config.validate_actions.then(|| Arc::clone(&catalog)),
            },
            config.engine,
        ));
        let messages = Arc::new(MessagesService::new(
            Arc::clone(&transport),
            Arc::clone(&engine),
        ));

        Self {
            keys,
            state,
            transport,
            catalog,
            activation,
            pairing,
            orchestrator,
            engine,
            messages,
        }
    }
}
