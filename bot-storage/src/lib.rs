//! Persistent storage for the device core.
//!
//! Everything here lives in one device data directory (see [`DataLayout`]):
//! - `configuration.json` and the key files, read through [`KeyMaterialStore`]
//! - the lifecycle state byte, via [`DeviceStateStore`]
//! - the offline action queue, via [`OfflineQueue`]
//! - the cached backend action list, via [`ActionCache`]
//!
//! Every write replaces its file atomically (temp file, fsync, rename).

mod action_cache;
mod atomic;
mod error;
mod keystore;
mod layout;
mod offline_queue;
mod state_store;

pub use action_cache::ActionCache;
pub use error::{StorageError, StorageResult};
pub use keystore::{DEFAULT_DEVICE_NAME, DeviceConfig, KeyMaterial, KeyMaterialStore};
pub use layout::{
    ACTIONS_FILE, CA_CERT_FILE, CONFIG_FILE, DEVICE_STATE_FILE, DataLayout, OFFLINE_ACTIONS_FILE,
    PRIVATE_KEY_FILE, PUBLIC_KEY_FILE,
};
pub use offline_queue::OfflineQueue;
pub use state_store::DeviceStateStore;
