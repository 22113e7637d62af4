//! In-process store for query results.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::DashSet;
use lru::LruCache;
use serde_json::Value;
use tokio::time::Instant;

use super::config::CacheConfig;
use super::keys::QueryKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A raw query result and the instant it was fetched.
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub value: Arc<Value>,
    pub fetched_at: Instant,
}

impl CachedResult {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// LRU of query results plus the set of keys with a refresh in flight.
pub struct QueryCache {
    enabled: bool,
    entries: RwLock<LruCache<QueryKey, CachedResult>>,
    refreshing: DashSet<QueryKey>,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            refreshing: DashSet::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(&CacheConfig::disabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedResult> {
        if !self.enabled {
            return None;
        }
        rw_write(&self.entries, SOURCE, "get").get(key).cloned()
    }

    pub fn put(&self, key: QueryKey, value: Arc<Value>, fetched_at: Instant) {
        if !self.enabled {
            return;
        }
        let evicted = rw_write(&self.entries, SOURCE, "put")
            .push(key.clone(), CachedResult { value, fetched_at })
            .filter(|(evicted_key, _)| *evicted_key != key);
        if evicted.is_some() {
            metrics::counter!("funguy_content_cache_evict_total").increment(1);
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark a background refresh as started. Returns false when one is
    /// already running for the key.
    pub fn begin_refresh(&self, key: &QueryKey) -> bool {
        self.refreshing.insert(key.clone())
    }

    pub fn finish_refresh(&self, key: &QueryKey) {
        self.refreshing.remove(key);
    }

    pub fn is_refreshing(&self, key: &QueryKey) -> bool {
        self.refreshing.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::application::content::QueryParams;

    fn key(query: &str) -> QueryKey {
        QueryKey::new(query, &QueryParams::new())
    }

    #[test]
    fn evicts_least_recently_used_entry() {
        let cache = QueryCache::new(&CacheConfig {
            enabled: true,
            capacity: 2,
        });
        let now = Instant::now();
        cache.put(key("a"), Arc::new(json!(1)), now);
        cache.put(key("b"), Arc::new(json!(2)), now);
        assert!(cache.get(&key("a")).is_some());
        cache.put(key("c"), Arc::new(json!(3)), now);

        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("a")).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = QueryCache::disabled();
        cache.put(key("a"), Arc::new(json!(1)), Instant::now());
        assert!(cache.get(&key("a")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn refresh_marker_is_exclusive_until_finished() {
        let cache = QueryCache::new(&CacheConfig::default());
        let key = key("a");
        assert!(cache.begin_refresh(&key));
        assert!(!cache.begin_refresh(&key));
        assert!(cache.is_refreshing(&key));
        cache.finish_refresh(&key);
        assert!(cache.begin_refresh(&key));
    }
}
