//! Actions and their persisted offline form.

use crate::ids::QueueId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A single triggered action, built per delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Backend action identifier.
    pub action_id: String,
    /// Optional numeric value (payment amount, reading, ...).
    pub value: Option<f64>,
    /// Idempotency key for this attempt.
    pub queue_id: QueueId,
    /// Backend identity for multipair devices.
    pub alternate_id: Option<String>,
}

impl Action {
    /// Creates an action with a freshly minted queue id.
    pub fn new(
        action_id: impl Into<String>,
        value: Option<f64>,
        alternate_id: Option<String>,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            value,
            queue_id: QueueId::new(),
            alternate_id,
        }
    }

    /// Rebuilds the action stored in an offline record.
    ///
    /// The queued id is reused so the backend sees the same transaction.
    #[must_use]
    pub fn replay(record: &OfflineActionRecord) -> Self {
        Self {
            action_id: record.action_id.clone(),
            value: record.value,
            queue_id: record.queue_id,
            alternate_id: if record.multipair {
                record.alternate_id.clone()
            } else {
                None
            },
        }
    }

    /// Builds the JSON payload signed into the request envelope.
    ///
    /// Shape: `{"bot": {"deviceID", "actionID", "queueID", "alternativeID"?, "value"?}}`.
    #[must_use]
    pub fn payload(&self, device_id: &str) -> Value {
        let mut bot = Map::new();
        bot.insert("deviceID".into(), json!(device_id));
        bot.insert("actionID".into(), json!(self.action_id));
        bot.insert("queueID".into(), json!(self.queue_id.to_string()));
        if let Some(alt) = &self.alternate_id {
            bot.insert("alternativeID".into(), json!(alt));
        }
        if let Some(value) = self.value {
            bot.insert("value".into(), json!(value));
        }
        json!({ "bot": bot })
    }

    /// Converts this action into a pending offline record.
    #[must_use]
    pub fn to_offline_record(
        &self,
        device_id: &str,
        maker_id: &str,
        timestamp: u64,
    ) -> OfflineActionRecord {
        OfflineActionRecord {
            offline: true,
            device_id: device_id.to_string(),
            maker_id: maker_id.to_string(),
            action_id: self.action_id.clone(),
            queue_id: self.queue_id,
            multipair: self.alternate_id.is_some(),
            alternate_id: self.alternate_id.clone(),
            value: self.value,
            timestamp,
        }
    }
}

/// An action that could not be delivered and awaits replay.
///
/// Records are only ever mutated by clearing `offline` after a successful
/// replay, or removed from the queue altogether.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineActionRecord {
    /// True while the record is still pending.
    pub offline: bool,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "makerID")]
    pub maker_id: String,
    #[serde(rename = "actionID")]
    pub action_id: String,
    #[serde(rename = "queueID")]
    pub queue_id: QueueId,
    pub multipair: bool,
    #[serde(rename = "alternateID", default, skip_serializing_if = "Option::is_none")]
    pub alternate_id: Option<String>,
    /// Absent when the action carried no value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Epoch seconds at which the action was queued.
    pub timestamp: u64,
}

impl OfflineActionRecord {
    /// Returns true while the record still needs a replay.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.offline
    }

    /// Marks the record as delivered.
    pub fn mark_delivered(&mut self) {
        self.offline = false;
    }
}
