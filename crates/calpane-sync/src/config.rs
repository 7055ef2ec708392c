//! Coordinator and notice configuration.

use std::time::Duration;

/// What the coordinator does when a fetch for one source fails.
///
/// Neither policy records the window as fetched, so a later run always
/// retries the failed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Give up on the source for this run and move to the next one.
    #[default]
    Advance,
    /// Retry the same source with exponential backoff, then advance.
    Retry {
        /// Total attempts, including the first.
        max_attempts: u32,
        /// Delay before the second attempt.
        initial_backoff: Duration,
        /// Upper bound for any single delay.
        max_backoff: Duration,
    },
}

impl FailurePolicy {
    const BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Retries up to `max_attempts` total attempts, starting at one second.
    pub fn retry(max_attempts: u32) -> Self {
        Self::Retry {
            max_attempts,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Total attempts allowed per source and run. Never zero.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Advance => 1,
            Self::Retry { max_attempts, .. } => (*max_attempts).max(1),
        }
    }

    /// Delay to wait after `failures` consecutive failures.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        let Self::Retry {
            initial_backoff,
            max_backoff,
            ..
        } = self
        else {
            return Duration::ZERO;
        };
        if failures == 0 {
            return Duration::ZERO;
        }

        let delay = initial_backoff.as_secs_f64()
            * Self::BACKOFF_MULTIPLIER.powi(failures.saturating_sub(1) as i32);
        Duration::from_secs_f64(delay.min(max_backoff.as_secs_f64()))
    }
}

/// Fetch coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Upper bound for a single remote fetch.
    pub fetch_timeout: Duration,
    /// How long an error notice stays up before it is cleared.
    pub notice_clear_delay: Duration,
    /// Behavior on fetch failure.
    pub failure_policy: FailurePolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            notice_clear_delay: Duration::from_secs(3),
            failure_policy: FailurePolicy::Advance,
        }
    }
}

impl CoordinatorConfig {
    /// Builder: set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Builder: set the notice clear delay.
    pub fn with_notice_clear_delay(mut self, delay: Duration) -> Self {
        self.notice_clear_delay = delay;
        self
    }

    /// Builder: set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Notice channel configuration.
#[derive(Debug, Clone, Copy)]
pub struct NoticeConfig {
    /// Notices buffered per subscriber before the slowest one lags.
    pub capacity: usize,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}
