//! Local copy of the backend's action list.

use crate::atomic::{read_optional, write_atomic};
use crate::error::StorageResult;
use bot_types::ActionDefinition;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Caches the last successfully fetched action list in `actions.json`.
#[derive(Debug, Clone)]
pub struct ActionCache {
    path: PathBuf,
}

impl ActionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached list, or `None` if nothing was cached yet.
    pub async fn load(&self) -> StorageResult<Option<Vec<ActionDefinition>>> {
        let Some(bytes) = read_optional(&self.path).await? else {
            return Ok(None);
        };
        let actions: Vec<ActionDefinition> = serde_json::from_slice(&bytes)?;
        debug!(count = actions.len(), "Loaded cached actions");
        Ok(Some(actions))
    }

    /// Replaces the cached list.
    pub async fn store(&self, actions: &[ActionDefinition]) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(actions)?;
        write_atomic(&self.path, &json).await?;
        debug!(count = actions.len(), "Cached actions");
        Ok(())
    }
}
