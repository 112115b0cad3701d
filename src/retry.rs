//! Delay strategies for the ownership contention loop.
//!
//! While another live tab owns a task,
//! [`retrieve`](crate::PendingTasks::retrieve) sleeps between reads. A
//! [`RetryStrategy`] decides how long, and whether to keep going at all.
//!
//! The default, [`FixedDelay::default`], polls every 500 ms forever.

use std::fmt;
use std::time::Duration;

use crate::constants::DEFAULT_POLL_INTERVAL_MS;

/// Decides the wait before each re-read of a contended task.
pub trait RetryStrategy: Send + Sync + fmt::Debug {
    /// Delay before re-reading after `attempt` previous waits (the first
    /// wait is attempt `0`). `None` means stop waiting.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay every time, optionally for a limited number of waits.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pending_tasks::{FixedDelay, RetryStrategy};
///
/// let unbounded = FixedDelay::default();
/// assert_eq!(unbounded.next_delay(1_000_000), Some(Duration::from_millis(500)));
///
/// let bounded = FixedDelay::new(Duration::from_millis(10)).with_max_attempts(2);
/// assert_eq!(bounded.next_delay(1), Some(Duration::from_millis(10)));
/// assert_eq!(bounded.next_delay(2), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    /// Wait between reads.
    pub delay: Duration,
    /// Maximum number of waits, or `None` for no limit.
    pub max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Unbounded polling every `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Stops after `max_attempts` waits.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl RetryStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }
}

/// Delay that grows by `multiplier` each wait, capped at `max_delay`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pending_tasks::{ExponentialBackoff, RetryStrategy};
///
/// let backoff = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1));
/// assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
/// assert_eq!(backoff.next_delay(10), Some(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExponentialBackoff {
    /// Delay before the first re-read.
    pub initial: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor per wait.
    pub multiplier: u32,
    /// Maximum number of waits, or `None` for no limit.
    pub max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// Doubling backoff from `initial` up to `max_delay`, unbounded.
    pub fn new(initial: Duration, max_delay: Duration) -> Self {
        Self {
            initial,
            max_delay,
            multiplier: 2,
            max_attempts: None,
        }
    }

    /// Sets the growth factor.
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Stops after `max_attempts` waits.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }
        let factor = self.multiplier.saturating_pow(attempt);
        let delay = self
            .initial
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}
