//! Bounded exponential backoff for waiting on an unavailable target.

use std::time::Duration;

use crate::utils::config::RetryConsts;

/// How long, and how many times, a copy worker waits for its target root to come back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Waits before the task is given up. `0` fails transient errors immediately.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Cap for a single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: RetryConsts::MAX_ATTEMPTS,
            initial_delay: RetryConsts::INITIAL_DELAY,
            max_delay: RetryConsts::MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before wait number `attempt` (0-based): `initial * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Fresh schedule for one task.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            policy: *self,
            attempt: 0,
        }
    }
}

/// Iterator over the waits of one task; ends after `max_attempts` delays.
#[derive(Clone, Debug)]
pub struct Backoff {
    policy: RetryPolicy,
    attempt: u32,
}

impl Backoff {
    /// Waits handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
