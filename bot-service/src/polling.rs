//! Bounded fixed-interval polling.

use crate::config::PollingConfig;
use std::future::Future;
use tracing::info;

/// How a polling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The check passed on attempt `attempts`.
    Succeeded { attempts: u32 },
    /// Every attempt failed.
    Exhausted { attempts: u32 },
}

impl PollOutcome {
    pub fn succeeded(self) -> bool {
        matches!(self, PollOutcome::Succeeded { .. })
    }

    pub fn attempts(self) -> u32 {
        match self {
            PollOutcome::Succeeded { attempts } | PollOutcome::Exhausted { attempts } => attempts,
        }
    }
}

/// Runs `check` up to `config.max_attempts` times, sleeping `config.interval`
/// between attempts. There is no sleep after the last attempt.
pub(crate) async fn poll_until<F, Fut>(config: PollingConfig, what: &str, mut check: F) -> PollOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    let max = config.max_attempts.max(1);
    for attempt in 1..=max {
        info!("Checking {what}, attempt {attempt} of {max}");
        if check(attempt).await {
            return PollOutcome::Succeeded { attempts: attempt };
        }
        if attempt < max {
            tokio::time::sleep(config.interval).await;
        }
    }
    PollOutcome::Exhausted { attempts: max }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(max_attempts: u32) -> PollingConfig {
        PollingConfig {
            max_attempts,
            interval: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_exactly_max_attempts() {
        let mut calls = 0;
        let start = tokio::time::Instant::now();
        let outcome = poll_until(config(4), "test", |_| {
            calls += 1;
            async { false }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 4 });
        assert_eq!(calls, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let mut calls = 0;
        let outcome = poll_until(config(10), "test", |attempt| {
            calls += 1;
            async move { attempt == 2 }
        })
        .await;
        assert_eq!(outcome, PollOutcome::Succeeded { attempts: 2 });
        assert_eq!(calls, 2);
    }
}
