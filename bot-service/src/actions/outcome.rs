//! What happened to a triggered action.

use bot_types::DeviceState;
use serde::Serialize;
use std::fmt;

/// Why an action was refused. Rejected actions are never queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Delivery needs an `Active` or `Multipair` device.
    NotEnrolled { state: DeviceState },
    MissingActionId,
    /// Multipair devices must name the identity an action belongs to.
    MissingAlternateId,
    /// The backend (or the cached catalog) does not know this action.
    ActionNotFound,
    /// The action's frequency does not allow another trigger yet.
    TooFrequent,
    /// The backend answered with a non-200 status.
    Backend { status: u16 },
    /// The persisted device state could not be read.
    StateUnavailable,
    /// The delivery worker is gone.
    EngineStopped,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotEnrolled { state } => write!(f, "Device not activated ({state})"),
            RejectReason::MissingActionId => f.write_str("Missing parameter `actionID`"),
            RejectReason::MissingAlternateId => f.write_str("Missing parameter `alternativeID`"),
            RejectReason::ActionNotFound => f.write_str("Action not triggered as its not found"),
            RejectReason::TooFrequent => f.write_str("Action triggered too frequently"),
            RejectReason::Backend { status } => write!(f, "Backend refused action (HTTP {status})"),
            RejectReason::StateUnavailable => f.write_str("Device state unavailable"),
            RejectReason::EngineStopped => f.write_str("Action delivery is not running"),
        }
    }
}

/// Result of `trigger_action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The backend acknowledged the action.
    Delivered,
    /// The action waits in the offline queue. `persisted` is false if the
    /// queue file could not be written.
    QueuedOffline { persisted: bool },
    Rejected(RejectReason),
}

impl DeliveryOutcome {
    /// Status code reported to local callers.
    pub fn http_status(&self) -> u16 {
        match self {
            DeliveryOutcome::Delivered => 200,
            DeliveryOutcome::QueuedOffline { .. } => 201,
            DeliveryOutcome::Rejected(RejectReason::ActionNotFound)
            | DeliveryOutcome::Rejected(RejectReason::Backend { status: 404 }) => 404,
            DeliveryOutcome::Rejected(_) => 400,
        }
    }

    /// Human-readable summary for local callers.
    pub fn message(&self) -> String {
        match self {
            DeliveryOutcome::Delivered => "Action triggered successful".to_string(),
            DeliveryOutcome::QueuedOffline { persisted: true } => {
                "Action saved offline, will be retried".to_string()
            }
            DeliveryOutcome::QueuedOffline { persisted: false } => {
                "Action could not be delivered or saved".to_string()
            }
            DeliveryOutcome::Rejected(reason) => reason.to_string(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}
