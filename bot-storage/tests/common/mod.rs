#![allow(dead_code)]

use bot_types::{Action, OfflineActionRecord};

pub fn pending_record(action_id: &str, timestamp: u64) -> OfflineActionRecord {
    Action::new(action_id, None, None).to_offline_record("dev-1", "maker-1", timestamp)
}

pub fn delivered_record(action_id: &str, timestamp: u64) -> OfflineActionRecord {
    let mut record = pending_record(action_id, timestamp);
    record.mark_delivered();
    record
}
