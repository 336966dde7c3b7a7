//! In-memory TTL cache.
//!
//! An entry is dead once `now >= stored_at + ttl`. Reads check that on every
//! call and drop dead entries they find; the sweeper only reclaims memory
//! for entries nobody reads again.

use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::key::Namespace;
use crate::config::CacheConfig;
use crate::observability::metrics;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.stored_at + self.ttl
    }
}

/// Snapshot for the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub keys: Vec<String>,
}

/// Process-local cache of JSON payloads.
pub struct CacheStore {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn ttl_for(&self, namespace: Namespace) -> Duration {
        namespace.ttl(&self.config)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.config.sweep_interval_secs)
    }

    /// Live value for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let lookup = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.payload.clone()));

        let value = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                None
            }
            None => None,
        };
        metrics::record_cache_lookup(namespace_of(key), value.is_some());
        value
    }

    /// Store `value` for `ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                payload: value,
                stored_at: Instant::now(),
                ttl,
            },
        );
        metrics::record_cache_size(self.entries.len());
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        metrics::record_cache_size(self.entries.len());
        removed
    }

    /// Remove everything. Returns the number of entries dropped.
    pub fn clear(&self) -> usize {
        let before = self.entries.len();
        self.entries.clear();
        metrics::record_cache_size(0);
        before
    }

    /// Remove every key containing `pattern`.
    pub fn invalidate_by_pattern(&self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::info!(pattern = %pattern, removed, "Invalidated cache entries");
        }
        metrics::record_cache_size(self.entries.len());
        removed
    }

    /// Physically remove expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        metrics::record_cache_size(self.entries.len());
        before.saturating_sub(self.entries.len())
    }

    /// Entries physically held, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live keys, sorted.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        CacheStats {
            entries: keys.len(),
            keys,
        }
    }
}

fn namespace_of(key: &str) -> &str {
    key.split_once(':').map_or(key, |(prefix, _)| prefix)
}
