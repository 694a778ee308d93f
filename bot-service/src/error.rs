//! Service error types.

use bot_types::DeviceState;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the lifecycle and delivery services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(#[from] bot_storage::StorageError),

    #[error("transport error: {0}")]
    Transport(#[from] bot_transport::TransportError),

    #[error("type error: {0}")]
    Types(#[from] bot_types::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The time source could not produce a timestamp.
    #[error("clock unavailable: {0}")]
    Clock(String),

    /// The operation needs an enrolled device.
    #[error("device not enrolled (state {0})")]
    NotEnrolled(DeviceState),

    /// The delivery worker has shut down.
    #[error("delivery engine stopped")]
    EngineStopped,
}
