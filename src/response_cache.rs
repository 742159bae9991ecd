// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Response Cache
 * Bounded TTL cache with two-pass eviction and hit/miss metrics
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

/// Entry count that triggers an eviction pass
const DEFAULT_SOFT_CAP: usize = 1000;

/// Entry count the oldest-first trim reduces to
const DEFAULT_HARD_CAP: usize = 800;

/// Cache keys are clamped to this many characters
const MAX_KEY_LEN: usize = 100;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// In-memory TTL cache with a bounded footprint.
///
/// When an insert pushes the entry count past the soft cap, stale entries
/// are dropped first; if the count still exceeds the hard cap, the
/// oldest-inserted entries go until it does. Best-effort by contract: no
/// operation here can fail a fetch.
pub struct ResponseCache<V> {
    ttl: Duration,
    soft_cap: usize,
    hard_cap: usize,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_caps(ttl, DEFAULT_SOFT_CAP, DEFAULT_HARD_CAP)
    }

    pub fn with_caps(ttl: Duration, soft_cap: usize, hard_cap: usize) -> Self {
        Self {
            ttl,
            soft_cap,
            hard_cap,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Derive a cache key from a URL and its canonical options.
    ///
    /// `serde_json` keeps object keys sorted, so equal option sets serialize
    /// identically regardless of construction order. Path separators and
    /// colons are flattened and the key is clamped; a collision past the
    /// clamp is an accepted approximation.
    pub fn cache_key(url: &str, options: &serde_json::Value) -> String {
        let raw = format!("{}:{}", url, options);
        raw.chars()
            .map(|c| if c == '/' || c == ':' { '_' } else { c })
            .take(MAX_KEY_LEN)
            .collect()
    }

    /// Fetch a live value; a stale entry is purged and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );

        if entries.len() > self.soft_cap {
            let before = entries.len();

            let ttl = self.ttl;
            entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

            if entries.len() > self.hard_cap {
                let mut by_age: Vec<(String, Instant)> = entries
                    .iter()
                    .map(|(k, entry)| (k.clone(), entry.inserted_at))
                    .collect();
                by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

                let excess = entries.len() - self.hard_cap;
                for (key, _) in by_age.into_iter().take(excess) {
                    entries.remove(&key);
                }
            }

            debug!(
                evicted = before - entries.len(),
                remaining = entries.len(),
                "cache trimmed"
            );
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        debug!("cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
