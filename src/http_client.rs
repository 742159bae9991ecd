// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Resilient Fetch Client
 * Cache, circuit breaker, rate limiter and retry composed around one HTTP call
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::time::Instant;

use reqwest::Method;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::config::FetchConfig;
use crate::errors::{FetchError, FetchResult};
use crate::rate_limiter::RateLimiter;
use crate::response_cache::{CacheStats, ResponseCache};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::session::{SessionRegistry, SharedClientPool};

/// Maximum response body size (10MB) to prevent memory exhaustion
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub duration_ms: u64,
}

impl FetchResponse {
    pub fn contains(&self, pattern: &str) -> bool {
        self.body.contains(pattern)
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_lowercase()).cloned()
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Form(String),
    Json(serde_json::Value),
}

/// One fetch through the reliability pipeline.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Route through the named persistent session instead of the shared pool
    pub session: Option<String>,
    pub use_cache: bool,
}

impl FetchRequest {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: Vec::new(),
            body: None,
            session: None,
            use_cache: true,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session = Some(session_id.to_string());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Configuration echo and component state for operational visibility
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub ssl_verify: bool,
    pub max_connections: usize,
    pub max_connections_per_host: usize,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub rate_limit: String,
    pub pool_open: bool,
    pub active_sessions: usize,
    pub cache: CacheStats,
    pub open_circuits: usize,
    pub tracked_domains: usize,
}

/// Fetch client composing the reliability layer around a pooled HTTP call.
///
/// Control flow per request: URL validation, cache lookup, circuit-breaker
/// check, rate-limiter admission, retry-wrapped send, then outcome recording
/// and cache population. Every component is an owned instance; none of the
/// locks is held across the network call.
pub struct FetchClient {
    config: FetchConfig,
    pool: SharedClientPool,
    sessions: SessionRegistry,
    rate_limiter: RateLimiter,
    circuit_breaker: CircuitBreaker,
    cache: ResponseCache<FetchResponse>,
    retry: RetryConfig,
}

impl FetchClient {
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        config.check()?;

        let pool = SharedClientPool::new(&config);
        let sessions = SessionRegistry::new(&config);
        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_period());
        let circuit_breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
        let cache = ResponseCache::new(config.cache_ttl());
        let retry = RetryConfig::default().with_max_attempts(config.max_retries);

        Ok(Self {
            config,
            pool,
            sessions,
            rate_limiter,
            circuit_breaker,
            cache,
            retry,
        })
    }

    /// Replace the circuit breaker configuration
    pub fn with_circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = CircuitBreaker::new(config);
        self
    }

    /// Replace the retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn cache(&self) -> &ResponseCache<FetchResponse> {
        &self.cache
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn get(&self, url: &str) -> FetchResult<FetchResponse> {
        self.execute(FetchRequest::get(url)).await
    }

    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: Vec<(String, String)>,
    ) -> FetchResult<FetchResponse> {
        let mut request = FetchRequest::get(url);
        request.headers = headers;
        self.execute(request).await
    }

    pub async fn post_form(&self, url: &str, form_data: &str) -> FetchResult<FetchResponse> {
        self.execute(
            FetchRequest::new(Method::POST, url)
                .with_body(RequestBody::Form(form_data.to_string())),
        )
        .await
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> FetchResult<FetchResponse> {
        self.execute(
            FetchRequest::new(Method::POST, url).with_body(RequestBody::Json(body.clone())),
        )
        .await
    }

    /// Send with an arbitrary HTTP method (e.g. OPTIONS, PATCH, PURGE)
    pub async fn request_with_method(&self, method: &str, url: &str) -> FetchResult<FetchResponse> {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| FetchError::Configuration(format!("invalid HTTP method: {}", method)))?;
        self.execute(FetchRequest::new(method, url)).await
    }

    pub async fn execute(&self, request: FetchRequest) -> FetchResult<FetchResponse> {
        let host = self.validate_url(&request.url)?;

        let cache_key = (self.config.cache_enabled
            && request.use_cache
            && request.method == Method::GET)
            .then(|| ResponseCache::<FetchResponse>::cache_key(&request.url, &options_value(&request)));

        if let Some(key) = &cache_key {
            if let Some(hit) = self.cache.get(key).await {
                debug!(url = %request.url, "cache hit");
                return Ok(hit);
            }
        }

        if self.circuit_breaker.is_open(&host).await {
            return Err(FetchError::CircuitOpen { host });
        }

        match self.config.rate_limit_wait_timeout() {
            Some(timeout) => {
                self.rate_limiter
                    .await_admission_timeout(&host, timeout)
                    .await?
            }
            None => self.rate_limiter.await_admission(&host).await,
        }

        let client = match &request.session {
            Some(session_id) => (*self.sessions.get_or_create(session_id).await?).clone(),
            None => self.pool.get().await?,
        };

        let started = Instant::now();
        let request_ref = &request;
        let result = retry_with_backoff(&self.retry, "fetch", || {
            let client = client.clone();
            async move { self.send_once(&client, request_ref).await }
        })
        .await;

        match result {
            Ok(mut response) => {
                response.duration_ms = started.elapsed().as_millis() as u64;
                self.circuit_breaker.record_success(&host).await;
                if let Some(key) = cache_key {
                    self.cache.insert(key, response.clone()).await;
                }
                Ok(response)
            }
            Err(err) => {
                self.circuit_breaker.record_failure(&host).await;
                warn!(url = %request.url, error = %err, "fetch failed");
                Err(err)
            }
        }
    }

    async fn send_once(
        &self,
        client: &reqwest::Client,
        request: &FetchRequest,
    ) -> FetchResult<FetchResponse> {
        let mut builder = client.request(request.method.clone(), request.url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            Some(RequestBody::Form(data)) => builder
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(data.clone()),
            Some(RequestBody::Json(value)) => builder.json(value),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        let headers = {
            let raw = response.headers();
            let mut map = HashMap::with_capacity(raw.len());
            for (name, value) in raw.iter() {
                if let Ok(value) = value.to_str() {
                    map.insert(name.as_str().to_string(), value.to_string());
                }
            }
            map
        };

        let bytes = response.bytes().await?;
        let body = if bytes.len() > MAX_BODY_SIZE {
            warn!(
                url = %request.url,
                size = bytes.len(),
                "response body truncated"
            );
            String::from_utf8_lossy(&bytes[..MAX_BODY_SIZE]).into_owned()
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        Ok(FetchResponse {
            status_code: status.as_u16(),
            headers,
            body,
            duration_ms: 0,
        })
    }

    fn validate_url(&self, raw: &str) -> FetchResult<String> {
        let invalid = || FetchError::InvalidUrl {
            url: raw.to_string(),
        };

        let parsed = Url::parse(raw).map_err(|_| invalid())?;

        if !matches!(parsed.scheme(), "http" | "https") {
            warn!(url = raw, scheme = parsed.scheme(), "rejected URL scheme");
            return Err(invalid());
        }

        let host = parsed.host_str().ok_or_else(invalid)?;

        if !self.config.allow_local_addrs
            && matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0")
        {
            warn!(url = raw, "rejected loopback URL");
            return Err(invalid());
        }

        Ok(host.to_string())
    }

    pub async fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            ssl_verify: self.config.ssl_verify,
            max_connections: self.config.max_connections,
            max_connections_per_host: self.config.max_connections_per_host,
            cache_enabled: self.config.cache_enabled,
            cache_ttl_secs: self.config.cache_ttl_secs,
            max_retries: self.config.max_retries,
            timeout_secs: self.config.timeout_secs,
            rate_limit: format!(
                "{} requests per {}s",
                self.config.rate_limit_requests, self.config.rate_limit_period_secs
            ),
            pool_open: self.pool.is_open().await,
            active_sessions: self.sessions.active_sessions().await,
            cache: self.cache.stats().await,
            open_circuits: self.circuit_breaker.open_circuits().await,
            tracked_domains: self.rate_limiter.tracked_keys().await,
        }
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        self.sessions.close(session_id).await
    }

    pub async fn close_all_sessions(&self) {
        self.sessions.close_all().await
    }

    /// Tear down the shared pool and every named session
    pub async fn shutdown(&self) {
        self.pool.close().await;
        self.sessions.close_all().await;
    }
}

/// Canonical request options for cache key derivation. Header order never
/// changes the key.
fn options_value(request: &FetchRequest) -> serde_json::Value {
    let mut headers: Vec<String> = request
        .headers
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    headers.sort();

    json!({
        "headers": headers,
        "method": request.method.as_str(),
        "session": request.session,
    })
}
