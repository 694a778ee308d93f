//! Persistent queue of actions awaiting replay.
//!
//! The queue file is a JSON array of [`OfflineActionRecord`] in insertion
//! order. A missing file is an empty queue. Once no record is pending the file
//! is removed rather than rewritten. A file that no longer parses is moved
//! aside before a new queue is started, so its records can still be recovered.

use crate::atomic::{read_optional, remove_if_exists, set_aside, write_atomic};
use crate::error::{StorageError, StorageResult};
use bot_types::OfflineActionRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// File-backed offline action queue.
///
/// The queue does no locking of its own; the delivery worker is its only
/// writer.
#[derive(Debug, Clone)]
pub struct OfflineQueue {
    path: PathBuf,
}

impl OfflineQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every record, pending or not.
    pub async fn load(&self) -> StorageResult<Vec<OfflineActionRecord>> {
        let Some(bytes) = read_optional(&self.path).await? else {
            return Ok(Vec::new());
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let records: Vec<OfflineActionRecord> = serde_json::from_slice(&bytes)?;
        debug!(count = records.len(), "Loaded offline queue");
        Ok(records)
    }

    /// Writes the list back, or removes the file when nothing is pending.
    pub async fn save(&self, records: &[OfflineActionRecord]) -> StorageResult<()> {
        if !records.iter().any(OfflineActionRecord::is_pending) {
            return self.clear().await;
        }
        let json = serde_json::to_vec(records)?;
        write_atomic(&self.path, &json).await?;
        Ok(())
    }

    /// Appends one record at the end of the queue.
    pub async fn append(&self, record: OfflineActionRecord) -> StorageResult<()> {
        let mut records = match self.load().await {
            Ok(records) => records,
            Err(StorageError::Serialization(e)) => {
                let moved = set_aside(&self.path).await?;
                error!(
                    path = %moved.display(),
                    "Offline queue unreadable, moved aside and starting a new one: {e}"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        debug!(action_id = %record.action_id, queue_id = %record.queue_id, "Queueing offline action");
        records.push(record);
        self.save(&records).await
    }

    /// Removes the queue file.
    pub async fn clear(&self) -> StorageResult<()> {
        remove_if_exists(&self.path).await?;
        Ok(())
    }

    /// Number of records still pending.
    pub async fn pending_count(&self) -> StorageResult<usize> {
        Ok(self.load().await?.iter().filter(|r| r.is_pending()).count())
    }

    /// Returns true if at least one record is pending.
    pub async fn has_pending(&self) -> StorageResult<bool> {
        Ok(self.pending_count().await? > 0)
    }
}
