// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Circuit Breaker Pattern
 * Per-host failure gate with lazy recovery
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,

    /// How long the circuit stays open after the last failure
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CircuitEntry {
    failure_count: u32,
    last_failure: Option<Instant>,
}

impl CircuitEntry {
    fn is_open(&self, threshold: u32) -> bool {
        self.failure_count >= threshold
    }
}

/// Advisory failure gate keyed by host.
///
/// Callers check [`is_open`](Self::is_open) before attempting an operation
/// and report the outcome afterwards; the breaker never intercepts calls.
/// Recovery is lazy: the first check after `recovery_timeout` has elapsed
/// since the last failure resets the entry and reports closed.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    circuits: RwLock<HashMap<String, CircuitEntry>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_open(&self, key: &str) -> bool {
        let mut circuits = self.circuits.write().await;

        let Some(entry) = circuits.get_mut(key) else {
            return false;
        };

        if let Some(last_failure) = entry.last_failure {
            if last_failure.elapsed() >= self.config.recovery_timeout {
                debug!(host = key, "circuit breaker recovery window elapsed, resetting");
                entry.failure_count = 0;
                entry.last_failure = None;
                return false;
            }
        }

        entry.is_open(self.config.failure_threshold)
    }

    pub async fn record_success(&self, key: &str) {
        let mut circuits = self.circuits.write().await;
        if let Some(entry) = circuits.get_mut(key) {
            entry.failure_count = 0;
            entry.last_failure = None;
        }
    }

    pub async fn record_failure(&self, key: &str) {
        let mut circuits = self.circuits.write().await;
        let entry = circuits.entry(key.to_string()).or_default();

        entry.failure_count += 1;
        entry.last_failure = Some(Instant::now());

        if entry.is_open(self.config.failure_threshold) {
            warn!(
                host = key,
                failures = entry.failure_count,
                "circuit breaker open"
            );
        }
    }

    /// Count of circuits currently open (snapshot; does not reset recovered
    /// entries)
    pub async fn open_circuits(&self) -> usize {
        let circuits = self.circuits.read().await;
        circuits
            .values()
            .filter(|entry| {
                entry.is_open(self.config.failure_threshold)
                    && entry
                        .last_failure
                        .map(|t| t.elapsed() < self.config.recovery_timeout)
                        .unwrap_or(false)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: recovery,
        })
    }

    #[tokio::test]
    async fn test_opens_after_threshold_failures() {
        let cb = breaker(3, Duration::from_secs(60));

        assert!(!cb.is_open("example.com").await);

        cb.record_failure("example.com").await;
        cb.record_failure("example.com").await;
        assert!(!cb.is_open("example.com").await);

        cb.record_failure("example.com").await;
        assert!(cb.is_open("example.com").await);

        // Independent key unaffected
        assert!(!cb.is_open("other.com").await);
        assert_eq!(cb.open_circuits().await, 1);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let cb = breaker(2, Duration::from_secs(60));

        cb.record_failure("example.com").await;
        cb.record_failure("example.com").await;
        assert!(cb.is_open("example.com").await);

        cb.record_success("example.com").await;
        assert!(!cb.is_open("example.com").await);

        // A single new failure is below the threshold again
        cb.record_failure("example.com").await;
        assert!(!cb.is_open("example.com").await);
    }

    #[tokio::test]
    async fn test_recovers_after_timeout() {
        let cb = breaker(2, Duration::from_millis(100));

        cb.record_failure("example.com").await;
        cb.record_failure("example.com").await;
        assert!(cb.is_open("example.com").await);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!cb.is_open("example.com").await);

        // Lazy reset cleared the count, not just the gate
        cb.record_failure("example.com").await;
        assert!(!cb.is_open("example.com").await);
    }
}
