//! Process-local, namespaced TTL cache for the device-set query engine and
//! the inventory generator, who both re-query the same upstream SMS fields
//! far more often than those fields actually change.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

const DEFAULT_TTL_SECONDS: i64 = 300;

#[derive(Clone)]
struct Entry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub namespaces: HashMap<String, usize>,
    pub keys: Vec<String>,
}

/// A single cache, shared behind an `Arc` by whichever subsystems need it.
pub struct Cache {
    store: Mutex<HashMap<(String, String), Entry>>,
    default_ttl: ChronoDuration,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECONDS as u64))
    }
}

impl Cache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
            default_ttl: ChronoDuration::from_std(default_ttl)
                .unwrap_or_else(|_| ChronoDuration::seconds(DEFAULT_TTL_SECONDS)),
        }
    }

    /// Fetch a value, evicting it first if its TTL has lapsed.
    pub fn get(&self, namespace: &str, key: &str) -> Option<serde_json::Value> {
        let cache_key = (namespace.to_string(), key.to_string());
        let mut store = self.store.lock();
        match store.get(&cache_key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.value.clone()),
            Some(_) => {
                store.remove(&cache_key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, namespace: &str, key: &str, value: serde_json::Value) {
        self.set_with_ttl(namespace, key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, namespace: &str, key: &str, value: serde_json::Value, ttl: ChronoDuration) {
        let cache_key = (namespace.to_string(), key.to_string());
        let expires_at = Utc::now() + ttl;
        trace!(namespace, key, %expires_at, "caching value");
        self.store.lock().insert(cache_key, Entry { value, expires_at });
    }

    pub fn clear_namespace(&self, namespace: &str) {
        self.store.lock().retain(|(ns, _), _| ns != namespace);
    }

    pub fn clear_all(&self) {
        self.store.lock().clear();
    }

    /// Drop every entry whose TTL has already lapsed. Intended to be called
    /// periodically from a background task; `get` also self-heals lazily so
    /// this is just about bounding memory between reads.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut store = self.store.lock();
        let before = store.len();
        store.retain(|_, entry| entry.expires_at > now);
        before - store.len()
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        let mut namespaces: HashMap<String, usize> = HashMap::new();
        let mut keys = Vec::with_capacity(store.len());
        for (ns, key) in store.keys() {
            *namespaces.entry(ns.clone()).or_insert(0) += 1;
            keys.push(format!("{ns}:{key}"));
        }
        CacheStats {
            total_entries: store.len(),
            namespaces,
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_returns_value() {
        let cache = Cache::default();
        cache.set("devices", "role:edge", json!(["r1", "r2"]));
        assert_eq!(cache.get("devices", "role:edge"), Some(json!(["r1", "r2"])));
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let cache = Cache::new(Duration::from_secs(0));
        cache.set("devices", "role:edge", json!([]));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("devices", "role:edge"), None);
    }

    #[test]
    fn clear_namespace_only_affects_that_namespace() {
        let cache = Cache::default();
        cache.set("devices", "a", json!(1));
        cache.set("templates", "b", json!(2));
        cache.clear_namespace("devices");
        assert_eq!(cache.get("devices", "a"), None);
        assert_eq!(cache.get("templates", "b"), Some(json!(2)));
    }

    #[test]
    fn stats_report_counts_per_namespace() {
        let cache = Cache::default();
        cache.set("devices", "a", json!(1));
        cache.set("devices", "b", json!(2));
        cache.set("templates", "c", json!(3));
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.namespaces.get("devices"), Some(&2));
    }

    #[test]
    fn purge_expired_removes_only_lapsed_entries() {
        let cache = Cache::new(Duration::from_secs(0));
        cache.set("devices", "a", json!(1));
        std::thread::sleep(Duration::from_millis(5));
        cache.set_with_ttl("devices", "b", json!(2), ChronoDuration::seconds(60));
        let removed = cache.purge_expired();
        assert_eq!(removed, 1);
        assert_eq!(cache.get("devices", "b"), Some(json!(2)));
    }
}
