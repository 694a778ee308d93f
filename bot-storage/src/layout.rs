//! File layout of the device data directory.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "configuration.json";
pub const PRIVATE_KEY_FILE: &str = "private.key";
pub const PUBLIC_KEY_FILE: &str = "public.key";
pub const CA_CERT_FILE: &str = "cacert.cer";
pub const ACTIONS_FILE: &str = "actions.json";
pub const OFFLINE_ACTIONS_FILE: &str = "offline.json";
pub const DEVICE_STATE_FILE: &str = "device_state.bin";

/// Resolves the well-known files inside a device data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.root.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.root.join(PUBLIC_KEY_FILE)
    }

    pub fn ca_cert_path(&self) -> PathBuf {
        self.root.join(CA_CERT_FILE)
    }

    pub fn actions_path(&self) -> PathBuf {
        self.root.join(ACTIONS_FILE)
    }

    pub fn offline_actions_path(&self) -> PathBuf {
        self.root.join(OFFLINE_ACTIONS_FILE)
    }

    pub fn device_state_path(&self) -> PathBuf {
        self.root.join(DEVICE_STATE_FILE)
    }
}
