//! # Fibonacci Backoff
//!
//! Per-object retry pacing for failed reconciliations. Delays grow along the
//! Fibonacci sequence in whole minutes (1m, 1m, 2m, 3m, 5m, 8m, then capped) and
//! drop back to the start after the first clean pass.
//!
//! A tracked object that stops failing without a clean pass (it was deleted
//! between retries) is dropped once it has been idle for twice the longest delay.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shortest retry delay, in minutes
pub const MIN_BACKOFF_MINUTES: u64 = 1;
/// Longest retry delay, in minutes
pub const MAX_BACKOFF_MINUTES: u64 = 10;

/// Fibonacci backoff calculator
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff bounded by `min_minutes` and `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_minutes * 60);

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_MINUTES, MAX_BACKOFF_MINUTES)
    }
}

#[derive(Debug)]
struct TrackedFailure {
    backoff: FibonacciBackoff,
    last_failure: Instant,
}

/// Backoff sequences keyed by object identity ("kind/namespace/name")
#[derive(Debug)]
pub struct BackoffTracker {
    states: Mutex<HashMap<String, TrackedFailure>>,
    idle_expiry: Duration,
}

impl Default for BackoffTracker {
    fn default() -> Self {
        Self {
            states: Mutex::default(),
            idle_expiry: Duration::from_secs(2 * MAX_BACKOFF_MINUTES * 60),
        }
    }
}

impl BackoffTracker {
    /// Tracker with no recorded failures
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed pass for `key` and return how long to wait before retrying
    pub fn record_failure(&self, key: &str) -> Duration {
        self.record_failure_at(key, Instant::now())
    }

    fn record_failure_at(&self, key: &str, now: Instant) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let idle_expiry = self.idle_expiry;
        states.retain(|_, tracked| now.saturating_duration_since(tracked.last_failure) <= idle_expiry);

        let tracked = states
            .entry(key.to_string())
            .or_insert_with(|| TrackedFailure {
                backoff: FibonacciBackoff::default(),
                last_failure: now,
            });
        tracked.last_failure = now;
        tracked.backoff.next_backoff()
    }

    /// Forget the failure history of `key` after a clean pass, or once the
    /// object is gone
    pub fn record_success(&self, key: &str) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(key);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
