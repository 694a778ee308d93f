//! Wall-clock time for action timestamps.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Source of the current epoch time.
#[async_trait]
pub trait TimeSource: Send + Sync {
    async fn now_epoch_seconds(&self) -> ServiceResult<u64>;
}

/// The host's system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl TimeSource for SystemClock {
    async fn now_epoch_seconds(&self) -> ServiceResult<u64> {
        let now = chrono::Utc::now().timestamp();
        u64::try_from(now).map_err(|_| ServiceError::Clock(format!("clock before epoch: {now}")))
    }
}

/// Asks `source` until it answers.
pub(crate) async fn now_with_retry(source: &dyn TimeSource, retry: Duration) -> u64 {
    let mut failures: u32 = 0;
    loop {
        match source.now_epoch_seconds().await {
            Ok(now) => return now,
            Err(e) => {
                failures += 1;
                warn!(failures, "Time source failed, retrying: {e}");
                tokio::time::sleep(retry).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyClock {
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl TimeSource for FlakyClock {
        async fn now_epoch_seconds(&self) -> ServiceResult<u64> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(ServiceError::Clock("ntp timeout".into()));
            }
            Ok(1_700_000_000)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_the_clock_answers() {
        let clock = FlakyClock {
            failures_left: AtomicU32::new(3),
        };
        let start = tokio::time::Instant::now();
        let now = now_with_retry(&clock, Duration::from_secs(1)).await;
        assert_eq!(now, 1_700_000_000);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn system_clock_is_after_2020() {
        assert!(SystemClock.now_epoch_seconds().await.unwrap() > 1_577_836_800);
    }
}
