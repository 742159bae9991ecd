// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Fetch Configuration
 * Explicit, validated configuration built once at startup
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{FetchError, FetchResult};

/// Configuration for the fetch pipeline.
///
/// Constructed from defaults or `HAAVI_*` environment variables exactly once
/// and handed to each component's constructor; components never read the
/// environment themselves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FetchConfig {
    /// Verify TLS certificates (disable only against self-signed test hosts)
    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    /// Advisory total connection budget, reported by health
    #[validate(range(min = 1, max = 10000))]
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Idle connections kept per host on the pooled client
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_max_connections_per_host")]
    pub max_connections_per_host: usize,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Total attempts for a fetch, including the first
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Admissions allowed per domain within the trailing period
    #[validate(range(min = 1, max = 100000))]
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,

    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_rate_limit_period")]
    pub rate_limit_period_secs: u64,

    /// Upper bound on the admission wait; `None` keeps the unbounded
    /// backpressure wait
    #[serde(default)]
    pub rate_limit_wait_timeout_secs: Option<u64>,

    /// Permit fetches to loopback hosts (integration tests rely on this)
    #[serde(default)]
    pub allow_local_addrs: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> usize {
    100
}

fn default_max_connections_per_host() -> usize {
    10
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_rate_limit_requests() -> usize {
    60
}

fn default_rate_limit_period() -> u64 {
    60
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ssl_verify: true,
            max_connections: default_max_connections(),
            max_connections_per_host: default_max_connections_per_host(),
            cache_enabled: true,
            cache_ttl_secs: default_cache_ttl(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout(),
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_period_secs: default_rate_limit_period(),
            rate_limit_wait_timeout_secs: None,
            allow_local_addrs: false,
        }
    }
}

impl FetchConfig {
    /// Load configuration from `HAAVI_*` environment variables on top of the
    /// defaults. An unparseable value is a configuration error, never a
    /// silent fallback.
    pub fn from_env() -> FetchResult<Self> {
        let mut config = Self::default();

        if let Some(value) = env_parse("HAAVI_SSL_VERIFY")? {
            config.ssl_verify = value;
        }
        if let Some(value) = env_parse("HAAVI_MAX_CONNECTIONS")? {
            config.max_connections = value;
        }
        if let Some(value) = env_parse("HAAVI_MAX_CONNECTIONS_PER_HOST")? {
            config.max_connections_per_host = value;
        }
        if let Some(value) = env_parse("HAAVI_ENABLE_CACHE")? {
            config.cache_enabled = value;
        }
        if let Some(value) = env_parse("HAAVI_CACHE_TTL")? {
            config.cache_ttl_secs = value;
        }
        if let Some(value) = env_parse("HAAVI_MAX_RETRIES")? {
            config.max_retries = value;
        }
        if let Some(value) = env_parse("HAAVI_TIMEOUT")? {
            config.timeout_secs = value;
        }
        if let Some(value) = env_parse("HAAVI_RATE_LIMIT_REQUESTS")? {
            config.rate_limit_requests = value;
        }
        if let Some(value) = env_parse("HAAVI_RATE_LIMIT_PERIOD")? {
            config.rate_limit_period_secs = value;
        }
        if let Some(value) = env_parse("HAAVI_RATE_LIMIT_WAIT_TIMEOUT")? {
            config.rate_limit_wait_timeout_secs = Some(value);
        }
        if let Some(value) = env_parse("HAAVI_ALLOW_LOCAL_ADDRS")? {
            config.allow_local_addrs = value;
        }

        config.check()?;
        Ok(config)
    }

    /// Run range validation, mapping validator output into the fetch error
    /// taxonomy.
    pub fn check(&self) -> FetchResult<()> {
        self.validate()
            .map_err(|e| FetchError::Configuration(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_period(&self) -> Duration {
        Duration::from_secs(self.rate_limit_period_secs)
    }

    pub fn rate_limit_wait_timeout(&self) -> Option<Duration> {
        self.rate_limit_wait_timeout_secs.map(Duration::from_secs)
    }
}

fn env_parse<T: FromStr>(name: &str) -> FetchResult<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            FetchError::Configuration(format!("invalid value for {}: {}", name, raw))
        }),
        Err(_) => Ok(None),
    }
}
