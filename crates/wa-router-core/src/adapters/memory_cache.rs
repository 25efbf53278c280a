//! # In-Memory Resolution Cache
//!
//! Thread-safe process-local implementation of [`ResolutionCache`] with a
//! fixed expiry per entry. Expired entries are dropped on read, by
//! [`InMemoryResolutionCache::cleanup_expired`], and by a sweep on write once
//! the map holds [`REAP_THRESHOLD`] entries.

use crate::cache::{
    CacheError, CacheKey, CacheStatistics, CachedRoute, ResolutionCache, DEFAULT_CACHE_TTL,
};
use crate::{Timestamp, VendorCode};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

/// Entry count at which a write first sweeps expired entries.
pub const REAP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct CacheEntry {
    route: CachedRoute,
    expires_at: Timestamp,
}

impl CacheEntry {
    fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
struct CacheStats {
    hits: u64,
    misses: u64,
    expired_removed: u64,
    evictions: u64,
}

/// Thread-safe in-memory resolution cache
///
/// Uses RwLock for concurrent access with minimal contention. Clones share
/// the same entries.
#[derive(Clone)]
pub struct InMemoryResolutionCache {
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    stats: Arc<RwLock<CacheStats>>,
    ttl: Duration,
}

impl InMemoryResolutionCache {
    /// Create new empty cache with the given entry expiry
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            ttl,
        }
    }

    /// Expiry applied to every entry
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every expired entry, returning how many were removed
    pub fn cleanup_expired(&self) -> Result<usize, CacheError> {
        let now = Timestamp::now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("cache"))?;
        let removed = Self::sweep(&mut entries, now);

        self.stats
            .write()
            .map_err(|_| Self::poisoned("stats"))?
            .expired_removed += removed as u64;
        Ok(removed)
    }

    fn sweep(entries: &mut HashMap<CacheKey, CacheEntry>, now: Timestamp) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn poisoned(what: &str) -> CacheError {
        CacheError::Unavailable {
            message: format!("{} lock poisoned", what),
        }
    }
}

impl Default for InMemoryResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[async_trait]
impl ResolutionCache for InMemoryResolutionCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedRoute>, CacheError> {
        let now = Timestamp::now();
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("cache"))?;
        let mut stats = self.stats.write().map_err(|_| Self::poisoned("stats"))?;

        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                stats.expired_removed += 1;
                stats.misses += 1;
                Ok(None)
            }
            Some(entry) => {
                stats.hits += 1;
                Ok(Some(entry.route.clone()))
            }
            None => {
                stats.misses += 1;
                Ok(None)
            }
        }
    }

    async fn set(&self, key: CacheKey, route: CachedRoute) -> Result<(), CacheError> {
        let now = Timestamp::now();
        let entry = CacheEntry {
            route,
            expires_at: now.add_duration(self.ttl),
        };

        let mut entries = self.entries.write().map_err(|_| Self::poisoned("cache"))?;
        let swept = if entries.len() >= REAP_THRESHOLD && !entries.contains_key(&key) {
            Self::sweep(&mut entries, now)
        } else {
            0
        };
        entries.insert(key, entry);
        drop(entries);

        if swept > 0 {
            self.stats
                .write()
                .map_err(|_| Self::poisoned("stats"))?
                .expired_removed += swept as u64;
        }
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let removed = self
            .entries
            .write()
            .map_err(|_| Self::poisoned("cache"))?
            .remove(key)
            .is_some();

        if removed {
            self.stats
                .write()
                .map_err(|_| Self::poisoned("stats"))?
                .evictions += 1;
        }
        Ok(removed)
    }

    async fn delete_vendor(&self, vendor_code: &VendorCode) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned("cache"))?;
        let before = entries.len();
        entries.retain(|key, _| key.vendor_code() != vendor_code);
        let removed = before - entries.len();

        self.stats
            .write()
            .map_err(|_| Self::poisoned("stats"))?
            .evictions += removed as u64;
        Ok(removed)
    }

    async fn statistics(&self) -> Result<CacheStatistics, CacheError> {
        let now = Timestamp::now();
        let entries = self.entries.read().map_err(|_| Self::poisoned("cache"))?;
        let stats = self.stats.read().map_err(|_| Self::poisoned("stats"))?;

        let total_requests = stats.hits + stats.misses;
        let hit_ratio = if total_requests > 0 {
            stats.hits as f64 / total_requests as f64
        } else {
            0.0
        };

        Ok(CacheStatistics {
            entries: entries.values().filter(|e| !e.is_expired(now)).count(),
            hits: stats.hits,
            misses: stats.misses,
            expired_removed: stats.expired_removed,
            evictions: stats.evictions,
            hit_ratio,
        })
    }
}

#[cfg(test)]
#[path = "memory_cache_tests.rs"]
mod tests;
