//! Bounded retry state machine driving the fetcher.

use color_eyre::eyre::eyre;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// How often and how patiently a failed download is retried.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sch_datasets::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries(), 3);
/// assert_eq!(policy.delay(), Duration::from_secs(1));
/// assert_eq!(policy.max_attempts(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Retries allowed after the first attempt unless configured otherwise.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Pause between attempts unless configured otherwise.
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    /// Creates a policy allowing `max_retries` retries separated by `delay`.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Creates a policy whose delay is given in (possibly fractional) seconds.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when `delay_secs` is negative, NaN, infinite,
    /// or too large to represent.
    pub fn from_secs_f64(max_retries: u32, delay_secs: f64) -> ConfigResult<Self> {
        let delay = Duration::try_from_secs_f64(delay_secs).map_err(|err| {
            ConfigError::from(eyre!("retry delay of {delay_secs} seconds is invalid: {err}"))
        })?;
        Ok(Self::new(max_retries, delay))
    }

    /// Retries allowed after the first attempt.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Pause between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Upper bound on network attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_DELAY)
    }
}

/// States of one fetch.
///
/// A fetch starts in [`FetchState::Attempting`]. A successful attempt moves to
/// [`FetchState::Succeeded`]; a transient failure moves to
/// [`FetchState::Retrying`] while budget remains and to
/// [`FetchState::Exhausted`] once it is spent. `Retrying` always leads back to
/// `Attempting` with the next attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// The transfer for `attempt` (1-based) is about to run.
    Attempting {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// `attempt` failed transiently; another attempt follows after the delay.
    Retrying {
        /// Attempt that just failed.
        attempt: u32,
        /// Retries left after the upcoming one.
        remaining: u32,
    },
    /// The transfer finished after `attempts` attempts.
    Succeeded {
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every allowed attempt failed.
    Exhausted {
        /// Attempts used.
        attempts: u32,
    },
}

impl FetchState {
    /// Initial state of every fetch.
    #[must_use]
    pub const fn start() -> Self {
        Self::Attempting { attempt: 1 }
    }

    /// State following [`FetchState::Retrying`]: the next attempt.
    #[must_use]
    pub const fn next_attempt(attempt: u32) -> Self {
        Self::Attempting {
            attempt: attempt.saturating_add(1),
        }
    }
}

/// Explicit retry budget counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    /// Starts a budget holding `policy.max_retries()` retries.
    #[must_use]
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            remaining: policy.max_retries(),
        }
    }

    /// Transition taken when `attempt` fails transiently.
    ///
    /// Spends one retry and returns [`FetchState::Retrying`] when any remain,
    /// otherwise returns [`FetchState::Exhausted`].
    pub const fn after_transient_failure(&mut self, attempt: u32) -> FetchState {
        if self.remaining == 0 {
            return FetchState::Exhausted { attempts: attempt };
        }
        self.remaining -= 1;
        FetchState::Retrying {
            attempt,
            remaining: self.remaining,
        }
    }
}
