//! In-memory cache for admin dashboard aggregates.
//!
//! Platform stats touch every table, so they are computed at most once per
//! TTL. Registrations and moderation actions call [`StatsCache::invalidate`]
//! so the dashboard reflects them on the next load.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::repository::PlatformStats;

/// Default TTL for cached stats.
const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// A cached value with expiration time.
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

pub struct StatsCache {
    stats: RwLock<Option<CacheEntry<PlatformStats>>>,
    /// User search totals keyed by the normalised query.
    user_counts: RwLock<HashMap<String, CacheEntry<i64>>>,
    ttl: Duration,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            stats: RwLock::new(None),
            user_counts: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get cached stats, or None if expired/missing.
    pub fn get_stats(&self) -> Option<PlatformStats> {
        self.stats
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|e| e.get()))
    }

    pub fn set_stats(&self, stats: PlatformStats) {
        if let Ok(mut guard) = self.stats.write() {
            *guard = Some(CacheEntry::new(stats, self.ttl));
        }
    }

    pub fn user_count_key(query: Option<&str>) -> String {
        query.unwrap_or("").trim().to_lowercase()
    }

    pub fn get_user_count(&self, key: &str) -> Option<i64> {
        self.user_counts
            .read()
            .ok()
            .and_then(|guard| guard.get(key).and_then(|e| e.get()))
    }

    pub fn set_user_count(&self, key: String, count: i64) {
        if let Ok(mut guard) = self.user_counts.write() {
            guard.insert(key, CacheEntry::new(count, self.ttl));
            if guard.len() > 100 {
                guard.retain(|_, entry| !entry.is_expired());
            }
        }
    }

    /// Drop everything (call after registrations and moderation actions).
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.stats.write() {
            *guard = None;
        }
        if let Ok(mut guard) = self.user_counts.write() {
            guard.clear();
        }
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}
