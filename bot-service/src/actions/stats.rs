//! Delivery counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals since the engine started.
#[derive(Debug, Default)]
pub(crate) struct DeliveryStats {
    total_actions: AtomicU64,
    total_offline_actions: AtomicU64,
}

impl DeliveryStats {
    pub(crate) fn record_delivered(&self) {
        self.total_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replayed(&self) {
        self.total_offline_actions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pending_offline: usize) -> StatsSnapshot {
        StatsSnapshot {
            total_actions: self.total_actions.load(Ordering::Relaxed),
            total_offline_actions: self.total_offline_actions.load(Ordering::Relaxed),
            pending_offline,
        }
    }
}

/// Point-in-time view of the delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Actions delivered on their first attempt.
    pub total_actions: u64,
    /// Offline actions delivered by a replay.
    pub total_offline_actions: u64,
    /// Records still waiting in the offline queue.
    pub pending_offline: usize,
}
