// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Haavi Fetch Toolkit
 * Resilient web fetching: rate limiting, circuit breaking, caching, retries
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod circuit_breaker;
pub mod config;
pub mod rate_limiter;
pub mod response_cache;
pub mod retry;
pub mod session;

// Fetch pipeline
pub mod http_client;

// Error handling
pub mod errors;
