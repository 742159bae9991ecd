// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Retry Logic with Exponential Backoff
 * Bounded retries with capped backoff and jitter
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

/// Retry configuration with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Base of the exponential backoff, in seconds
    pub backoff_factor: f64,

    /// Ceiling on a single backoff sleep, in seconds
    pub max_backoff_secs: f64,

    /// Fraction of the backoff added as uniform random jitter
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
            max_backoff_secs: 60.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff_secs: f64) -> Self {
        self.max_backoff_secs = max_backoff_secs;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    /// Sleep before retrying after the `attempt`-th failure (0-based):
    /// `min(backoff_factor^attempt, max_backoff)` seconds, plus up to
    /// `jitter_factor` of that as random jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self
            .backoff_factor
            .powi(attempt as i32)
            .min(self.max_backoff_secs);

        let jitter_range = base * self.jitter_factor;
        let jittered = if jitter_range > 0.0 {
            base + rand::rng().random_range(0.0..jitter_range)
        } else {
            base
        };

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Run `operation` up to `max_attempts` times, sleeping the attempt-indexed
/// backoff between failures. Every failure is retried; the final error is
/// returned to the caller unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        attempt,
                        operation = operation_name,
                        "operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if attempt >= max_attempts {
                    warn!(
                        attempts = attempt,
                        operation = operation_name,
                        error = %err,
                        "max retry attempts reached"
                    );
                    return Err(err);
                }

                let backoff = config.backoff_for(attempt - 1);
                debug!(
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    operation = operation_name,
                    error = %err,
                    "operation failed, backing off before retry"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_backoff_growth_and_cap() {
        let config = RetryConfig {
            max_attempts: 6,
            backoff_factor: 2.0,
            max_backoff_secs: 5.0,
            jitter_factor: 0.0,
        };

        assert_eq!(config.backoff_for(0), Duration::from_secs(1));
        assert_eq!(config.backoff_for(1), Duration::from_secs(2));
        assert_eq!(config.backoff_for(2), Duration::from_secs(4));
        assert_eq!(config.backoff_for(3), Duration::from_secs(5));
        assert_eq!(config.backoff_for(4), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let config = RetryConfig {
            max_attempts: 3,
            backoff_factor: 2.0,
            max_backoff_secs: 60.0,
            jitter_factor: 0.1,
        };

        for attempt in 0..4 {
            let base = 2.0_f64.powi(attempt as i32);
            let backoff = config.backoff_for(attempt).as_secs_f64();
            assert!(backoff >= base);
            assert!(backoff < base * 1.1 + f64::EPSILON);
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success_skips_backoff() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        // A sleep here would blow well past the assertion below
        let config = RetryConfig::default().with_max_backoff(30.0);

        let started = Instant::now();
        let result: Result<&str, String> = retry_with_backoff(&config, "test_operation", || {
            let counter = Arc::clone(&counter_clone);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let config = RetryConfig::default()
            .with_max_attempts(3)
            .with_max_backoff(0.02)
            .without_jitter();

        let result: Result<&str, String> = retry_with_backoff(&config, "test_operation", || {
            let counter = Arc::clone(&counter_clone);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("transient".to_string())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_final_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        let config = RetryConfig::default()
            .with_max_attempts(3)
            .with_max_backoff(0.02)
            .without_jitter();

        let result: Result<(), String> = retry_with_backoff(&config, "test_operation", || {
            let counter = Arc::clone(&counter_clone);
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", n))
            }
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err(), "failure 3");
    }
}
