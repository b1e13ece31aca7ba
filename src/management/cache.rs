use std::{collections::HashMap, time::Duration};

use tokio::{sync::Mutex, time::Instant};

use crate::types::{CacheStats, MatchCandidate};

struct CacheEntry {
    value: Vec<MatchCandidate>,
    expires_at: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// In-memory read-through cache of search results, keyed by
/// [`crate::utils::cache_key`].
///
/// Entries expire `ttl` after their last `set`. Expired entries are evicted
/// lazily on read and by [`CacheStore::purge_expired`].
pub struct CacheStore {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<MatchCandidate>> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        let fresh = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                inner.entries.remove(key);
                None
            }
            None => None,
        };

        match fresh {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores `value` with the store's default TTL.
    pub async fn set(&self, key: &str, value: Vec<MatchCandidate>) {
        self.set_with_ttl(key, value, self.ttl).await;
    }

    pub async fn set_with_ttl(&self, key: &str, value: Vec<MatchCandidate>, ttl: Duration) {
        let mut inner = self.inner.lock().await;
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drops every entry and resets the hit/miss counters.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    /// Removes expired entries and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        before - inner.entries.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            keys: inner
                .entries
                .values()
                .filter(|entry| entry.expires_at > now)
                .count(),
        }
    }
}
