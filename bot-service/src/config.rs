//! Service tuning knobs.

use std::time::Duration;

/// Bounded polling: at most `max_attempts` tries, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollingConfig {
    /// Pairing polls ten times, ten seconds apart.
    pub const fn pairing() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(10),
        }
    }

    /// Activation polls three times, ten seconds apart.
    pub const fn activation() -> Self {
        Self {
            max_attempts: 3,
            interval: Duration::from_secs(10),
        }
    }
}

/// Delivery engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay between attempts when the time source fails.
    pub clock_retry: Duration,
    /// Replay the offline queue before each new delivery.
    pub flush_before_delivery: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock_retry: Duration::from_secs(1),
            flush_before_delivery: true,
        }
    }
}

/// Configuration for the whole service stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub pairing: PollingConfig,
    pub activation: PollingConfig,
    pub engine: EngineConfig,
    /// Check actions against the backend catalog before delivery. Off by
    /// default since the check costs an extra request per trigger.
    pub validate_actions: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pairing: PollingConfig::pairing(),
            activation: PollingConfig::activation(),
            engine: EngineConfig::default(),
            validate_actions: false,
        }
    }
}
