//! # Bounded Polling
//!
//! `poll_until` replaces inline sleep/retry loops against eventually consistent
//! systems. The attempt ceiling and interval are explicit parameters, and the sleep is
//! injected so tests run without waiting.

use crate::PathwiseError;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::time::Duration;

/// Attempt ceiling and fixed interval of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub interval_secs: u64,
    pub max_attempts: u32,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(interval_secs: u64, max_attempts: u32) -> Self {
        Self {
            interval_secs,
            max_attempts,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Blocks the calling thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested sleeps without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.slept.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

/// Call `probe` until it yields a value or `policy.max_attempts` is reached.
///
/// `probe` receives the 1-based attempt number. There is no sleep before the first
/// attempt or after the last one. Running out of attempts is `PollTimeout`.
pub fn poll_until<T>(
    what: &str,
    policy: PollPolicy,
    sleeper: &dyn Sleeper,
    mut probe: impl FnMut(u32) -> Option<T>,
) -> Result<T, PathwiseError> {
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = probe(attempt) {
            return Ok(value);
        }
        if attempt < policy.max_attempts {
            tracing::debug!(what, attempt, "not ready, waiting");
            sleeper.sleep(policy.interval());
        }
    }
    Err(PathwiseError::PollTimeout {
        what: what.to_string(),
        attempts: policy.max_attempts,
    })
}

// =============================================================================
// TESTS
// =============================================================================
