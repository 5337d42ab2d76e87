//! # Exponential Backoff
//!
//! Provides the retry pacing for failed reconciles: exponential growth from
//! a base delay up to a cap, plus a per-resource jitter so that many
//! resources failing at once do not requeue in lockstep.
//!
//! The default sequence (base 10s, max 600s): 10s, 20s, 40s, 80s, 160s,
//! 320s, 600s (max).

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

/// Exponential backoff calculator
///
/// Each call doubles the previous delay, capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base backoff value in seconds (first delay, and reset target)
    base_secs: u64,
    /// Maximum backoff value in seconds
    max_secs: u64,
    /// Number of delays handed out since the last reset
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff with the given base and cap in
    /// seconds.
    #[must_use]
    pub fn new(base_secs: u64, max_secs: u64) -> Self {
        Self {
            base_secs,
            max_secs,
            attempt: 0,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence.
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = Self::for_attempt(self.attempt, self.base_secs, self.max_secs).as_secs();
        self.attempt = self.attempt.saturating_add(1);
        result
    }

    /// Get the next backoff duration as a `Duration` and advance the
    /// sequence.
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Calculate the backoff for a given attempt number (stateless).
    ///
    /// Attempt 0 returns `base_secs`; each further attempt doubles the
    /// delay, capped at `max_secs`.
    #[must_use]
    pub fn for_attempt(attempt: u32, base_secs: u64, max_secs: u64) -> Duration {
        // Shifting past 63 bits would wrap; the cap is hit long before that.
        let factor = 1u64 << attempt.min(32);
        Duration::from_secs(base_secs.saturating_mul(factor).min(max_secs))
    }
}

/// Spread a backoff delay by up to 25% based on the resource key and the
/// attempt number.
///
/// The jitter is deterministic per (key, attempt) pair, which keeps requeue
/// timing reproducible in tests while still de-synchronizing resources that
/// fail together.
#[must_use]
pub fn with_jitter(seconds: u64, key: &str, attempt: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    attempt.hash(&mut hasher);
    let spread = seconds / 4;
    if spread == 0 {
        return seconds;
    }
    seconds + hasher.finish() % (spread + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_sequence() {
        let mut backoff = ExponentialBackoff::new(10, 600);

        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 20);
        assert_eq!(backoff.next_backoff_seconds(), 40);
        assert_eq!(backoff.next_backoff_seconds(), 80);
        assert_eq!(backoff.next_backoff_seconds(), 160);
        assert_eq!(backoff.next_backoff_seconds(), 320);
        assert_eq!(backoff.next_backoff_seconds(), 600); // capped
    }

    #[test]
    fn test_exponential_backoff_max_cap() {
        let mut backoff = ExponentialBackoff::new(10, 600);

        for _ in 0..16 {
            let secs = backoff.next_backoff_seconds();
            assert!(secs <= 600);
        }
        // Should stay at max
        assert_eq!(backoff.next_backoff_seconds(), 600);
        assert_eq!(backoff.next_backoff_seconds(), 600);
    }

    #[test]
    fn test_exponential_backoff_reset() {
        let mut backoff = ExponentialBackoff::new(10, 600);

        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 20);
        assert_eq!(backoff.next_backoff_seconds(), 40);

        backoff.reset();

        // Should restart from the base after success
        assert_eq!(backoff.next_backoff_seconds(), 10);
        assert_eq!(backoff.next_backoff_seconds(), 20);
    }

    #[test]
    fn test_for_attempt_is_stateless() {
        assert_eq!(ExponentialBackoff::for_attempt(0, 10, 600).as_secs(), 10);
        assert_eq!(ExponentialBackoff::for_attempt(3, 10, 600).as_secs(), 80);
        assert_eq!(ExponentialBackoff::for_attempt(30, 10, 600).as_secs(), 600);
        // Large attempt counts must not overflow
        assert_eq!(ExponentialBackoff::for_attempt(u32::MAX, 10, 600).as_secs(), 600);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        for attempt in 0..8 {
            let jittered = with_jitter(100, "default/ingress", attempt);
            assert!((100..=125).contains(&jittered));
        }
        // Same inputs, same output
        assert_eq!(
            with_jitter(100, "default/ingress", 2),
            with_jitter(100, "default/ingress", 2)
        );
    }

    #[test]
    fn test_jitter_handles_tiny_delays() {
        assert_eq!(with_jitter(1, "a", 0), 1);
        assert_eq!(with_jitter(0, "a", 0), 0);
    }
}
