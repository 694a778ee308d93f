//! Device identity and key material.
//!
//! Everything the device needs to prove who it is: ids from
//! `configuration.json`, the RSA private key used to sign requests, the
//! public key shown during enrollment, and the CA certificate for TLS.

use crate::error::{StorageError, StorageResult};
use crate::layout::DataLayout;
use bot_types::{DeviceInfo, PairingMode};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Default device name when the configuration omits one.
pub const DEFAULT_DEVICE_NAME: &str = "BoT-ESP-32";

/// Static device configuration, as provisioned in `configuration.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Wi-Fi credentials consumed by the provisioning layer.
    #[serde(default)]
    pub wifi_ssid: Option<String>,
    #[serde(default)]
    pub wifi_passwd: Option<String>,
    /// When false, requests go over plain HTTP.
    #[serde(default = "default_true", deserialize_with = "flag")]
    pub https: bool,
    /// Selects the multipair enrollment track.
    #[serde(default, deserialize_with = "flag")]
    pub multipair: bool,
    pub maker_id: String,
    pub device_id: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default)]
    pub alt_device_id: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.to_string()
}

/// Accepts both JSON booleans and the `"true"`/`"false"` strings older
/// provisioning tools write.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.trim().eq_ignore_ascii_case("true") || s.trim() == "1",
    })
}

impl DeviceConfig {
    /// Creates a minimal configuration for the given identity.
    pub fn new(maker_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            wifi_ssid: None,
            wifi_passwd: None,
            https: true,
            multipair: false,
            maker_id: maker_id.into(),
            device_id: device_id.into(),
            device_name: default_device_name(),
            alt_device_id: None,
        }
    }

    /// Parses a configuration document.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::Config(format!("failed to parse configuration: {e}")))?;
        if config.device_id.trim().is_empty() || config.maker_id.trim().is_empty() {
            return Err(StorageError::Config(
                "device_id and maker_id must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// The pairing mode this configuration selects.
    #[must_use]
    pub fn pairing_mode(&self) -> PairingMode {
        if self.multipair {
            PairingMode::Multipair {
                alternate_id: self
                    .alt_device_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            }
        } else {
            PairingMode::Single
        }
    }
}

/// Read access to the device's identity and secrets.
pub trait KeyMaterialStore: Send + Sync {
    /// Backend device identifier.
    fn device_id(&self) -> &str;

    /// Backend maker identifier.
    fn maker_id(&self) -> &str;

    /// Human-readable device name.
    fn device_name(&self) -> &str;

    /// Enrollment track selected by the static configuration.
    fn pairing_mode(&self) -> &PairingMode;

    /// PEM-encoded RSA private key used for request signing.
    fn private_key_pem(&self) -> StorageResult<&str>;

    /// PEM-encoded public key shared during enrollment.
    fn public_key_pem(&self) -> Option<&str>;

    /// PEM-encoded CA certificate, if one was provisioned.
    fn ca_cert_pem(&self) -> Option<&str>;

    /// Whether the configuration asks for HTTPS.
    fn https_enabled(&self) -> bool;

    /// Alternate id for multipair devices.
    fn alternate_device_id(&self) -> Option<&str> {
        self.pairing_mode().alternate_id()
    }

    /// Returns true for multipair devices.
    fn is_multipair(&self) -> bool {
        self.pairing_mode().is_multipair()
    }

    /// Builds the enrollment document for this device.
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(
            self.device_id(),
            self.device_name(),
            self.maker_id(),
            self.public_key_pem().unwrap_or_default(),
            self.pairing_mode(),
        )
    }
}

/// Key material held in memory, loaded from a data directory or built directly.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    config: DeviceConfig,
    mode: PairingMode,
    private_key: Option<String>,
    public_key: Option<String>,
    ca_cert: Option<String>,
}

impl KeyMaterial {
    /// Creates key material from a configuration with no keys attached.
    #[must_use]
    pub fn new(config: DeviceConfig) -> Self {
        let mode = config.pairing_mode();
        Self {
            config,
            mode,
            private_key: None,
            public_key: None,
            ca_cert: None,
        }
    }

    /// Attaches the PEM private key.
    #[must_use]
    pub fn with_private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }

    /// Attaches the PEM public key.
    #[must_use]
    pub fn with_public_key(mut self, pem: impl Into<String>) -> Self {
        self.public_key = Some(pem.into());
        self
    }

    /// Attaches the PEM CA certificate.
    #[must_use]
    pub fn with_ca_cert(mut self, pem: impl Into<String>) -> Self {
        self.ca_cert = Some(pem.into());
        self
    }

    /// Returns the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Loads configuration and key files from a device data directory.
    ///
    /// `configuration.json` is required. Missing key files are tolerated here
    /// and surface later: no private key means requests cannot be signed, no
    /// CA certificate means the transport runs without TLS.
    pub async fn load(layout: &DataLayout) -> StorageResult<Self> {
        let config_path = layout.config_path();
        let json = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            StorageError::Config(format!("cannot read {}: {e}", config_path.display()))
        })?;
        let config = DeviceConfig::from_json(&json)?;
        info!(
            device_id = %config.device_id,
            multipair = config.multipair,
            "Loaded device configuration"
        );

        let mut material = Self::new(config);
        material.private_key = read_pem(&layout.private_key_path(), "private key").await?;
        material.public_key = read_pem(&layout.public_key_path(), "public key").await?;
        material.ca_cert = read_pem(&layout.ca_cert_path(), "CA certificate").await?;
        Ok(material)
    }
}

async fn read_pem(path: &Path, what: &str) -> StorageResult<Option<String>> {
    match crate::atomic::read_optional(path).await? {
        Some(bytes) => {
            let pem = String::from_utf8(bytes).map_err(|_| {
                StorageError::Config(format!("{what} at {} is not valid UTF-8", path.display()))
            })?;
            debug!("Loaded {what} from {}", path.display());
            Ok(Some(pem))
        }
        None => {
            warn!("No {what} provisioned at {}", path.display());
            Ok(None)
        }
    }
}

impl KeyMaterialStore for KeyMaterial {
    fn device_id(&self) -> &str {
        &self.config.device_id
    }

    fn maker_id(&self) -> &str {
        &self.config.maker_id
    }

    fn device_name(&self) -> &str {
        &self.config.device_name
    }

    fn pairing_mode(&self) -> &PairingMode {
        &self.mode
    }

    fn private_key_pem(&self) -> StorageResult<&str> {
        self.private_key
            .as_deref()
            .ok_or(StorageError::KeyMissing("private.key"))
    }

    fn public_key_pem(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    fn ca_cert_pem(&self) -> Option<&str> {
        self.ca_cert.as_deref()
    }

    fn https_enabled(&self) -> bool {
        self.config.https
    }
}
