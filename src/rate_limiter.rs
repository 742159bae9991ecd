// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Sliding-Window Rate Limiter
 * Per-domain admission control with blocking wait and periodic sweep
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::{FetchError, FetchResult};

/// Delay between admission polls while a window is full
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum interval between full sweeps across all keys
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

struct LimiterState {
    windows: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

/// Sliding-window rate limiter keyed by domain.
///
/// Admission is check-and-record atomic under one lock; the lock is never
/// held across a sleep or network call. A key's window is pruned on every
/// check, and a throttled full sweep bounds memory across many keys.
pub struct RateLimiter {
    max_requests: usize,
    period: Duration,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, period: Duration) -> Self {
        Self {
            max_requests,
            period,
            state: Mutex::new(LimiterState {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Admit and record a request for `key` iff fewer than `max_requests`
    /// were admitted within the trailing period. Denial records nothing.
    pub async fn admit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        if now.duration_since(state.last_sweep) >= SWEEP_INTERVAL {
            Self::sweep(&mut state, self.period, now);
        }

        let window = state.windows.entry(key.to_string()).or_default();
        window.retain(|t| now.duration_since(*t) < self.period);

        if window.len() >= self.max_requests {
            debug!(domain = key, in_window = window.len(), "admission denied");
            return false;
        }

        window.push(now);
        true
    }

    /// Poll `admit` until it succeeds. No upper bound on the wait; sustained
    /// overload turns into backpressure on the caller.
    pub async fn await_admission(&self, key: &str) {
        while !self.admit(key).await {
            warn!(domain = key, "rate limit exceeded, waiting for a slot");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Bounded variant of [`await_admission`](Self::await_admission); fails
    /// with [`FetchError::RateLimitTimeout`] once the deadline passes.
    pub async fn await_admission_timeout(&self, key: &str, timeout: Duration) -> FetchResult<()> {
        let started = Instant::now();
        while !self.admit(key).await {
            let waited = started.elapsed();
            if waited >= timeout {
                warn!(domain = key, ?waited, "gave up waiting for admission");
                return Err(FetchError::RateLimitTimeout {
                    domain: key.to_string(),
                    waited,
                });
            }
            let remaining = timeout - waited;
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
        Ok(())
    }

    /// Number of keys currently holding a window
    pub async fn tracked_keys(&self) -> usize {
        self.state.lock().await.windows.len()
    }

    fn sweep(state: &mut LimiterState, period: Duration, now: Instant) {
        let before = state.windows.len();
        state.windows.retain(|_, window| {
            window.retain(|t| now.duration_since(*t) < period);
            !window.is_empty()
        });
        state.last_sweep = now;
        debug!(
            keys_before = before,
            keys_after = state.windows.len(),
            "rate window sweep"
        );
    }
}
