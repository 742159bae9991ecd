// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Fetch Error Types
 * Error taxonomy for the resilient fetch pipeline
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the fetch pipeline.
///
/// Expected misses (cache lookup, closing an unknown session) are `Option`s
/// and `bool`s on the components themselves; only genuinely exceptional
/// conditions travel through this enum.
#[derive(Error, Debug)]
pub enum FetchError {
    /// URL failed validation: bad syntax, non-http scheme, or a loopback
    /// host while local addresses are disallowed.
    #[error("invalid or disallowed URL: {url}")]
    InvalidUrl { url: String },

    /// The circuit breaker is open for this host; the caller must fail fast.
    #[error("circuit breaker is open for {host}")]
    CircuitOpen { host: String },

    /// Bounded admission wait expired while the rate window stayed full.
    #[error("rate limit admission timed out for {domain} after {waited:?}")]
    RateLimitTimeout { domain: String, waited: Duration },

    /// The server answered with a 4xx/5xx status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection, TLS, timeout, or protocol failure from the HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;
