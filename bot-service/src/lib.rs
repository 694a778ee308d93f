//! Device lifecycle and action delivery for Banking of Things devices.
//!
//! The services here sit on top of `bot-storage` and `bot-transport`:
//! - [`PairingCoordinator`] and [`ActivationCoordinator`] poll the backend
//!   through NEW → PAIRED → ACTIVE
//! - [`ConfigurationOrchestrator`] sequences them from the stored state
//! - [`ActionDeliveryEngine`] delivers actions, queueing them offline when
//!   the backend is unreachable and replaying them later
//! - [`ActionCatalog`] and [`MessagesService`] cover the backend's action
//!   list and its queued messages
//!
//! [`DeviceCore`] assembles all of them for one device data directory.

mod actions;
mod activation;
mod catalog;
mod clock;
mod config;
mod configuration;
mod device;
mod error;
mod messages;
mod pairing;
mod polling;

pub use actions::{
    ActionDeliveryEngine, DeliveryOutcome, EngineDeps, FlushReport, RejectReason, StatsSnapshot,
};
pub use activation::{ActivationCoordinator, ActivationOutcome};
pub use catalog::{ActionCatalog, CatalogVerdict};
pub use clock::{SystemClock, TimeSource};
pub use config::{EngineConfig, PollingConfig, ServiceConfig};
pub use configuration::{
    ConfigurationOrchestrator, ConfigureOutcome, EnrollmentPresenter, LogPresenter,
};
pub use device::{CoreDeps, DeviceCore};
pub use error::{ServiceError, ServiceResult};
pub use messages::{Message, MessagesService};
pub use pairing::{PairingCoordinator, PairingOutcome, is_paired_response};
pub use polling::PollOutcome;
