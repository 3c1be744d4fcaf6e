//! Address recovery poll policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between recovery attempts (1 second).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default ceiling for exponential backoff.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Same delay every time.
    #[default]
    Fixed,
    /// Doubles after each attempt, capped at `max_interval`.
    Exponential,
}

/// Scheduling policy for the recovery poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Base delay between attempts.
    pub interval: Duration,
    /// Stop after this many `connect` retries. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay growth.
    pub backoff: Backoff,
    /// Upper bound on the delay when backing off.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            backoff: Backoff::Fixed,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy with no attempt cap.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Cap the number of retries.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Back off exponentially up to `max_interval`.
    pub fn with_exponential_backoff(mut self, max_interval: Duration) -> Self {
        self.backoff = Backoff::Exponential;
        self.max_interval = max_interval;
        self
    }

    /// Delay before the tick following `attempts` retries.
    pub fn delay_after(&self, attempts: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let factor = 1u32.checked_shl(attempts.min(31)).unwrap_or(u32::MAX);
                self.interval
                    .checked_mul(factor)
                    .unwrap_or(self.max_interval)
                    .min(self.max_interval)
            }
        }
    }

    /// Check whether another retry is allowed after `attempts` retries.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}
