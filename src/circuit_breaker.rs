//! # Circuit Breaker Module
//!
//! Fast-fail guard shared by the OCR detector and the product-search client.
//! After `circuit_breaker_threshold` consecutive failures the breaker opens
//! and rejects calls until `circuit_breaker_reset_secs` have elapsed, then lets
//! the next call through as a probe.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::ocr_config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for a named collaborator
///
/// ```text
/// CLOSED ──failures ≥ threshold──► OPEN ──reset timeout──► probe
///   ▲                                                        │
///   └──────────────────────success──────────────────────────┘
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use just_nutrition::circuit_breaker::CircuitBreaker;
    /// use just_nutrition::ocr_config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new("ocr", RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(name: &'static str, config: RecoveryConfig) -> Self {
        Self {
            name,
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if the breaker is open (blocking requests)
    ///
    /// Resets itself once the reset timeout has elapsed since the last failure.
    pub fn is_open(&self) -> bool {
        let mut state = self.state.lock();

        if state.failure_count < self.config.circuit_breaker_threshold {
            return false;
        }

        match state.last_failure_time {
            Some(last_time)
                if last_time.elapsed()
                    < Duration::from_secs(self.config.circuit_breaker_reset_secs) =>
            {
                true
            }
            _ => {
                info!(breaker = self.name, "Circuit breaker reset timeout elapsed, allowing probe");
                *state = BreakerState::default();
                crate::observability::update_circuit_breaker_state(self.name, false);
                false
            }
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
        if state.failure_count == self.config.circuit_breaker_threshold {
            warn!(
                breaker = self.name,
                failures = state.failure_count,
                "Circuit breaker opened"
            );
            crate::observability::update_circuit_breaker_state(self.name, true);
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.failure_count > 0 {
            *state = BreakerState::default();
            crate::observability::update_circuit_breaker_state(self.name, false);
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            RecoveryConfig {
                circuit_breaker_threshold: threshold,
                circuit_breaker_reset_secs: reset_secs,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_opens_at_threshold() {
        let cb = breaker(2, 60);
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(!cb.is_open());
        cb.record_failure();
        assert!(cb.is_open());
    }

    #[test]
    fn test_success_closes() {
        let cb = breaker(1, 60);
        cb.record_failure();
        assert!(cb.is_open());
        cb.record_success();
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_resets_after_timeout() {
        let cb = CircuitBreaker::new(
            "test",
            RecoveryConfig {
                circuit_breaker_threshold: 1,
                circuit_breaker_reset_secs: 1,
                ..Default::default()
            },
        );
        cb.record_failure();
        assert!(cb.is_open());
        std::thread::sleep(Duration::from_millis(1100));
        assert!(!cb.is_open());
        assert_eq!(cb.failure_count(), 0);
    }
}
