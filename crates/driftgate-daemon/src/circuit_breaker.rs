// crates/driftgate-daemon/src/circuit_breaker.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Sliding-window failure counter that opens for a cooldown
//              period once a failure threshold is crossed.
// Purpose: Guard the daemon cycle against a persistently failing
//          collaborator (§4.8, §5).
// Dependencies: (none beyond std)
// ============================================================================

//! ## Overview
//! Grounded on `original_source/hb/resilience.py`'s `CircuitBreaker`. Uses
//! [`std::time::Instant`] in place of `time.monotonic()`; the semantics are
//! unchanged.
//!
//! Invariants:
//! - `is_open` auto-resets the breaker once `open_sec` has elapsed since it
//!   opened, clearing the recorded failures along with it.
//! - `call` never suppresses the wrapped closure's error; it only records
//!   the outcome before propagating.

use std::time::Duration;
use std::time::Instant;

use crate::config::CircuitBreakerConfig;

/// Opens after `failure_threshold` failures land within `window_sec` of each
/// other; stays open for `open_sec` before resetting.
pub struct CircuitBreaker {
    failure_threshold: u32,
    window: Duration,
    open_for: Duration,
    failures: Vec<Instant>,
    opened_at: Option<Instant>,
}

/// Returned by [`CircuitBreaker::call`] when the breaker is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenError;

impl CircuitBreaker {
    /// Builds a breaker from daemon config tuning.
    #[must_use]
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            window: Duration::from_secs_f64(config.window_sec.max(0.0)),
            open_for: Duration::from_secs_f64(config.open_sec.max(0.0)),
            failures: Vec::new(),
            opened_at: None,
        }
    }

    fn prune(&mut self, now: Instant) {
        self.failures.retain(|at| now.duration_since(*at) <= self.window);
    }

    /// Records a successful cycle, pruning the failure window.
    pub fn record_success(&mut self) {
        let now = Instant::now();
        self.prune(now);
    }

    /// Records a failed cycle, opening the breaker if the threshold is
    /// crossed.
    pub fn record_failure(&mut self) {
        let now = Instant::now();
        self.failures.push(now);
        self.prune(now);
        if self.failures.len() >= self.failure_threshold as usize {
            self.opened_at = Some(now);
        }
    }

    /// Whether the breaker is currently open, auto-resetting if `open_sec`
    /// has elapsed since it opened.
    pub fn is_open(&mut self) -> bool {
        let Some(opened_at) = self.opened_at else {
            return false;
        };
        if Instant::now().duration_since(opened_at) >= self.open_for {
            self.opened_at = None;
            self.failures.clear();
            return false;
        }
        true
    }

    /// Runs `cycle` through the breaker, recording success/failure and
    /// refusing to run at all while open.
    ///
    /// # Errors
    /// Returns [`CircuitOpenError`] without calling `cycle` while the
    /// breaker is open. Propagates whatever error `cycle` returns otherwise.
    pub fn call<T, E>(&mut self, cycle: impl FnOnce() -> Result<T, E>) -> Result<Result<T, E>, CircuitOpenError> {
        if self.is_open() {
            return Err(CircuitOpenError);
        }
        let outcome = cycle();
        match &outcome {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(failure_threshold: u32, window_sec: f64, open_sec: f64) -> CircuitBreakerConfig {
        CircuitBreakerConfig { failure_threshold, window_sec, open_sec }
    }

    #[test]
    fn opens_after_threshold_failures_and_skips_the_call() {
        let mut breaker = CircuitBreaker::new(&config(2, 60.0, 60.0));
        let attempts = std::cell::Cell::new(0);
        for _ in 0..2 {
            let _ = breaker.call(|| {
                attempts.set(attempts.get() + 1);
                Err::<(), ()>(())
            });
        }
        assert!(breaker.is_open());
        let result = breaker.call(|| {
            attempts.set(attempts.get() + 1);
            Ok::<(), ()>(())
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn success_does_not_open_the_breaker() {
        let mut breaker = CircuitBreaker::new(&config(3, 60.0, 60.0));
        for _ in 0..5 {
            let result = breaker.call(|| Ok::<(), ()>(()));
            assert!(result.is_ok_and(|inner| inner.is_ok()));
        }
        assert!(!breaker.is_open());
    }

    #[test]
    fn auto_resets_once_the_open_period_elapses() {
        let mut breaker = CircuitBreaker::new(&config(1, 60.0, 0.0));
        let _ = breaker.call(|| Err::<(), ()>(()));
        assert!(!breaker.is_open());
    }
}
