//! Device lifecycle state and pairing mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the device, persisted as a single byte.
///
/// `Active` and `Multipair` are the terminal enrolled states. `Multipair` is
/// selected at configuration time and is never reached through `Paired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    /// Not yet paired with a backend account.
    #[default]
    New,
    /// Paired, waiting for activation.
    Paired,
    /// Activated; actions may be delivered.
    Active,
    /// Enrolled on the multipair track; actions carry an alternate id.
    Multipair,
}

impl DeviceState {
    /// Returns the persisted byte for this state.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Paired => 1,
            Self::Active => 2,
            Self::Multipair => 3,
        }
    }

    /// Decodes a persisted state byte.
    pub fn from_byte(byte: u8) -> crate::Result<Self> {
        match byte {
            0 => Ok(Self::New),
            1 => Ok(Self::Paired),
            2 => Ok(Self::Active),
            3 => Ok(Self::Multipair),
            other => Err(crate::Error::InvalidState(other)),
        }
    }

    /// Returns true if action delivery is permitted in this state.
    #[must_use]
    pub fn is_enrolled(self) -> bool {
        matches!(self, Self::Active | Self::Multipair)
    }

    /// Returns true if the device may enter the pairing flow.
    #[must_use]
    pub fn is_pairable(self) -> bool {
        matches!(self, Self::New | Self::Multipair)
    }

    /// Returns a human-readable status message.
    #[must_use]
    pub fn status_message(self) -> &'static str {
        match self {
            Self::New => "Device is not paired yet",
            Self::Paired => "Device is paired but not activated",
            Self::Active => "Device is active",
            Self::Multipair => "Device is active in multipair mode",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Paired => "PAIRED",
            Self::Active => "ACTIVE",
            Self::Multipair => "MULTIPAIR",
        };
        f.write_str(name)
    }
}

/// How the device was configured to enroll.
///
/// Multipair devices represent several backend identities; each delivered
/// action must name one through its alternate id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PairingMode {
    /// One device, one backend identity.
    #[default]
    Single,
    /// One device, many identities. The configured alternate id may be absent.
    Multipair { alternate_id: Option<String> },
}

impl PairingMode {
    /// Returns true for the multipair track.
    #[must_use]
    pub fn is_multipair(&self) -> bool {
        matches!(self, Self::Multipair { .. })
    }

    /// Returns the configured alternate id, if any.
    #[must_use]
    pub fn alternate_id(&self) -> Option<&str> {
        match self {
            Self::Single => None,
            Self::Multipair { alternate_id } => alternate_id.as_deref(),
        }
    }

    /// The state a freshly initialized device starts in.
    #[must_use]
    pub fn initial_state(&self) -> DeviceState {
        match self {
            Self::Single => DeviceState::New,
            Self::Multipair { .. } => DeviceState::Multipair,
        }
    }

    /// Returns true if `state` belongs to this mode's track.
    ///
    /// A stored `Multipair` state under a single-pair configuration (or the
    /// reverse) means the device was switched between modes.
    #[must_use]
    pub fn is_consistent_with(&self, state: DeviceState) -> bool {
        match self {
            Self::Single => state != DeviceState::Multipair,
            Self::Multipair { .. } => state == DeviceState::Multipair,
        }
    }

    /// The terminal enrolled state for this mode.
    #[must_use]
    pub fn terminal_state(&self) -> DeviceState {
        match self {
            Self::Single => DeviceState::Active,
            Self::Multipair { .. } => DeviceState::Multipair,
        }
    }
}
