//! Bounded retry budget for failovers.

use std::time::Duration;

/// Fixed pause between failover attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How many selection rounds a failover may run, and how long to wait between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_tries: u32,
    interval: Duration,
}

impl RetryPolicy {
    /// Create a policy; at least one attempt is always made.
    pub fn new(max_tries: u32, interval: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            interval,
        }
    }

    /// Split a hold budget into attempts spaced `interval` apart.
    ///
    /// A one second budget with the 100 ms poll interval gives 10 attempts.
    pub fn from_budget(budget: Duration, interval: Duration) -> Self {
        let tries = if interval.is_zero() {
            1
        } else {
            budget.as_nanos() / interval.as_nanos()
        };
        Self::new(u32::try_from(tries).unwrap_or(u32::MAX), interval)
    }

    /// One attempt, no waiting. Used by the read-path recheck.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Maximum number of selection rounds.
    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Pause between rounds.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pause to take before zero-based attempt `attempt`.
    ///
    /// Nothing before the first attempt, and nothing after the last one is
    /// ever requested.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 0 && !self.interval.is_zero()).then_some(self.interval)
    }
}

impl Default for RetryPolicy {
    /// The default hold budget of five seconds.
    fn default() -> Self {
        Self::from_budget(Duration::from_secs(5), POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget_is_fifty_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_tries(), 50);
        assert_eq!(policy.interval(), POLL_INTERVAL);
    }

    #[test]
    fn test_one_second_budget_is_ten_attempts() {
        let policy = RetryPolicy::from_budget(Duration::from_secs(1), POLL_INTERVAL);
        assert_eq!(policy.max_tries(), 10);
    }

    #[test]
    fn test_fractional_budget_truncates() {
        let policy = RetryPolicy::from_budget(Duration::from_millis(250), POLL_INTERVAL);
        assert_eq!(policy.max_tries(), 2);
    }

    #[test]
    fn test_tiny_budget_still_tries_once() {
        let policy = RetryPolicy::from_budget(Duration::from_millis(10), POLL_INTERVAL);
        assert_eq!(policy.max_tries(), 1);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        let policy = RetryPolicy::single_attempt();
        assert_eq!(policy.max_tries(), 1);
        assert_eq!(policy.delay_before(0), None);
        assert_eq!(policy.delay_before(1), None);
    }

    #[test]
    fn test_no_delay_before_first_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(0), None);
        assert_eq!(policy.delay_before(1), Some(POLL_INTERVAL));
    }
}
