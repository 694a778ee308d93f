//! Backend action definitions.

use serde::{Deserialize, Serialize};

const MINUTE: u64 = 60;
const HOUR: u64 = MINUTE * 60;
const DAY: u64 = HOUR * 24;
const WEEK: u64 = DAY * 7;

/// How often an action may be triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[serde(alias = "minuetly")]
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    #[serde(alias = "half-yearly")]
    HalfYearly,
    Yearly,
    Always,
    /// Any frequency string this firmware does not know.
    #[serde(other)]
    Unknown,
}

impl Frequency {
    /// Minimum seconds between two triggers, `None` when unrestricted.
    #[must_use]
    pub fn min_interval_secs(self) -> Option<u64> {
        match self {
            Self::Minutely => Some(MINUTE),
            Self::Hourly => Some(HOUR),
            Self::Daily => Some(DAY),
            Self::Weekly => Some(WEEK),
            Self::Monthly => Some(WEEK * 4),
            Self::HalfYearly => Some(WEEK * 26),
            Self::Yearly => Some(WEEK * 52),
            Self::Always | Self::Unknown => None,
        }
    }

    /// Returns true if an action last triggered at `last_triggered` may fire at `now`.
    ///
    /// Never-triggered actions are always due, and so are actions whose
    /// frequency this firmware does not recognise.
    #[must_use]
    pub fn is_due(self, last_triggered: Option<u64>, now: u64) -> bool {
        let Some(last) = last_triggered else {
            return true;
        };
        match self {
            Self::Always | Self::Unknown => true,
            other => {
                let interval = other.min_interval_secs().unwrap_or(0);
                now.saturating_sub(last) > interval
            }
        }
    }
}

/// An action as advertised by the backend's action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    #[serde(rename = "actionID")]
    pub action_id: String,
    pub frequency: Frequency,
    /// Epoch seconds of the last successful trigger from this device.
    #[serde(rename = "triggeredTime", default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<u64>,
}
