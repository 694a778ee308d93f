//! Device info document used for enrollment.

use crate::state::PairingMode;
use serde::{Deserialize, Serialize};

/// Identity summary shown to the companion app (encoded into the QR code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub name: String,
    #[serde(rename = "makerID")]
    pub maker_id: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// 1 for multipair devices, 0 otherwise.
    pub multipair: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aid: Option<String>,
}

impl DeviceInfo {
    /// Builds the device info for the given identity and pairing mode.
    pub fn new(
        device_id: impl Into<String>,
        name: impl Into<String>,
        maker_id: impl Into<String>,
        public_key: impl Into<String>,
        mode: &PairingMode,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            maker_id: maker_id.into(),
            public_key: public_key.into(),
            multipair: u8::from(mode.is_multipair()),
            aid: mode.alternate_id().map(str::to_string),
        }
    }

    /// Serializes to the compact JSON string encoded into the QR code.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
