// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter and a wall-clock budget.
//!
//! Each step doubles the previous delay and perturbs it by up to a quarter of
//! the doubled value in either direction, then clamps it to `max_delay`:
//!
//! ```text
//! doubled = current * 2
//! next    = clamp(doubled + U[-doubled, +doubled] / 4, 0, max_delay)
//! ```
//!
//! Retry instants are additionally capped at `started_at + total_timeout`, so
//! a retry is never scheduled past the end of the budget.

use std::time::{Duration, Instant};

use crate::jitter::JitterSource;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Default ceiling for a single delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
/// Default wall-clock budget for one request or reconnect cycle.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters of an exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay used for the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Budget measured from the start of the attempt.
    pub total_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            total_timeout: DEFAULT_TOTAL_TIMEOUT,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy from its three parameters.
    pub fn new(initial_delay: Duration, max_delay: Duration, total_timeout: Duration) -> Self {
        BackoffPolicy {
            initial_delay,
            max_delay,
            total_timeout,
        }
    }

    /// Delay for the first retry of an attempt.
    pub fn first_delay(&self) -> Duration {
        self.initial_delay.min(self.max_delay)
    }

    /// Computes the delay that follows `current`.
    pub fn next_delay(&self, current: Duration, jitter: &mut dyn JitterSource) -> Duration {
        let doubled = current.as_secs_f64() * 2.0;
        let spread = jitter.sample(doubled) / 4.0;
        let secs = (doubled + spread).clamp(0.0, self.max_delay.as_secs_f64());

        if secs.is_finite() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }

    /// Advances an optional delay: the first call yields [`first_delay`],
    /// later calls grow the previous value.
    ///
    /// [`first_delay`]: BackoffPolicy::first_delay
    pub fn advance(&self, current: Option<Duration>, jitter: &mut dyn JitterSource) -> Duration {
        match current {
            None => self.first_delay(),
            Some(delay) => self.next_delay(delay, jitter),
        }
    }

    /// Instant at which the budget started at `started_at` runs out.
    pub fn deadline(&self, started_at: Instant) -> Instant {
        started_at + self.total_timeout
    }

    /// Instant of the next retry, never later than the deadline.
    pub fn retry_at(&self, now: Instant, started_at: Instant, delay: Duration) -> Instant {
        (now + delay).min(self.deadline(started_at))
    }

    /// Whether the budget started at `started_at` is spent.
    pub fn is_exhausted(&self, now: Instant, started_at: Instant) -> bool {
        now.saturating_duration_since(started_at) >= self.total_timeout
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
