//! Wait Engine
//!
//! Polls a [`Condition`] at a fixed interval until it matches or a deadline
//! passes. Replaces every fixed sleep in test cases.
//!
//! ## Timing
//!
//! With timeout `T` and poll interval `P`:
//!
//! - the first evaluation happens immediately
//! - a condition that starts holding at `t < T` is observed by `t + P`
//! - a condition that never holds fails no earlier than `T` and no later
//!   than `T + P` (the last sleep is clamped to the deadline)
//!
//! Transient driver errors during a poll count as "not yet" and are kept as
//! the last observed state. An evaluation still running at the deadline is
//! dropped. All timing goes through `tokio::time`, so tests can run on a
//! paused clock.

use crate::condition::{Condition, Probe};
use crate::result::{VigilError, VigilResult};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, trace, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject a zero poll interval
    pub fn validate(&self) -> VigilResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(VigilError::invalid_state(
                "poll interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// A successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult<T> {
    /// Value extracted by the condition
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of evaluations, including the matching one
    pub polls: u32,
}

// =============================================================================
// WAITER IMPLEMENTATION
// =============================================================================

/// Polling engine bound to one set of options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    options: WaitOptions,
}

impl Waiter {
    /// Create a waiter, rejecting a zero poll interval
    pub fn new(options: WaitOptions) -> VigilResult<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> WaitOptions {
        self.options
    }

    /// Same poll interval, different timeout
    #[must_use]
    pub const fn with_timeout(self, timeout: Duration) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = timeout.as_millis() as u64;
        Self {
            options: self.options.with_timeout(timeout_ms),
        }
    }

    /// Poll `condition` against `session` until it matches or the timeout
    /// elapses.
    ///
    /// # Errors
    ///
    /// [`VigilError::WaitTimeout`] carrying the condition name, elapsed time
    /// and last observed state; non-transient errors from the condition are
    /// returned immediately.
    pub async fn wait_for<C>(&self, session: &Session, condition: &C) -> VigilResult<WaitResult<C::Output>>
    where
        C: Condition + ?Sized,
    {
        let start = Instant::now();
        let deadline = start + self.options.timeout();
        let poll_interval = self.options.poll_interval();
        let mut polls = 0_u32;

        let last_state = loop {
            polls += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let state = match timeout(remaining, condition.evaluate(session)).await {
                Ok(Ok(Probe::Matched(value))) => {
                    let elapsed = start.elapsed();
                    debug!(
                        condition = %condition.name(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        polls,
                        "condition matched"
                    );
                    return Ok(WaitResult {
                        value,
                        elapsed,
                        polls,
                    });
                }
                Ok(Ok(Probe::NotYet(state))) => {
                    trace!(condition = %condition.name(), %state, "not yet");
                    state
                }
                Ok(Err(err)) if err.is_transient() => {
                    trace!(condition = %condition.name(), error = %err, "transient error while polling");
                    format!("error: {err}")
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    trace!(condition = %condition.name(), "evaluation cut off at deadline");
                    "evaluation still pending at deadline".to_string()
                }
            };

            let now = Instant::now();
            if now >= deadline {
                break state;
            }
            sleep(poll_interval.min(deadline - now)).await;
        };

        let elapsed = start.elapsed();
        warn!(
            condition = %condition.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            %last_state,
            "wait timed out"
        );
        Err(VigilError::WaitTimeout {
            condition: condition.name(),
            elapsed,
            last_state,
        })
    }
}
