//! Action delivery: immediate triggers with an offline fallback.

mod engine;
mod outcome;
mod stats;

pub use engine::{ActionDeliveryEngine, EngineDeps, FlushReport};
pub use outcome::{DeliveryOutcome, RejectReason};
pub use stats::StatsSnapshot;
