//! Durable device lifecycle state.

use crate::atomic::{read_optional, remove_if_exists, write_atomic};
use crate::error::StorageResult;
use bot_types::DeviceState;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Holds the device lifecycle state as a single persisted byte.
///
/// Reads are served from an in-memory copy after the first load. Writes go
/// to disk before the cache is updated, so a successful `set` is durable.
pub struct DeviceStateStore {
    path: PathBuf,
    cached: Mutex<Option<DeviceState>>,
}

impl DeviceStateStore {
    /// Creates a store backed by `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current state. A missing file reads as `New`.
    pub async fn get(&self) -> StorageResult<DeviceState> {
        let mut cached = self.cached.lock().await;
        if let Some(state) = *cached {
            return Ok(state);
        }

        let state = match read_optional(&self.path).await? {
            Some(bytes) => match bytes.first() {
                Some(&byte) => DeviceState::from_byte(byte)?,
                None => DeviceState::New,
            },
            None => DeviceState::New,
        };
        debug!(%state, "Loaded device state");
        *cached = Some(state);
        Ok(state)
    }

    /// Durably replaces the state.
    pub async fn set(&self, state: DeviceState) -> StorageResult<()> {
        let mut cached = self.cached.lock().await;
        write_atomic(&self.path, &[state.as_byte()]).await?;
        if *cached != Some(state) {
            info!(%state, "Device state changed");
        }
        *cached = Some(state);
        Ok(())
    }

    /// Forgets the persisted state; the device reads as `New` afterwards.
    pub async fn reset(&self) -> StorageResult<()> {
        let mut cached = self.cached.lock().await;
        remove_if_exists(&self.path).await?;
        *cached = Some(DeviceState::New);
        info!("Device state reset");
        Ok(())
    }
}
