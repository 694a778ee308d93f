//! Core type definitions for the Banking of Things device core.
//!
//! This crate defines the types shared by storage, transport and the
//! service layer:
//! - Device lifecycle state and the pairing mode it was configured with
//! - Actions and their persisted offline records
//! - Queue identifiers (UUID v4 idempotency keys)
//! - The device info document used for enrollment
//! - Backend action definitions and trigger frequencies

mod action;
mod catalog;
mod device;
mod ids;
mod state;

pub use action::{Action, OfflineActionRecord};
pub use catalog::{ActionDefinition, Frequency};
pub use device::DeviceInfo;
pub use ids::QueueId;
pub use state::{DeviceState, PairingMode};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid device state byte: {0}")]
    InvalidState(u8),
}
