//! Key-value cache contract and in-memory implementation.
//!
//! The router caches serialized responses under tenant-scoped key
//! prefixes; ingestion invalidates by prefix on success. TTL expiry is
//! lazy: expired entries are dropped on access.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use prospectus_core::error::Result;

/// Key-value cache contract with TTL.
pub trait KvCache: Send + Sync {
    /// Fetch a value; expired entries read as absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value with a TTL.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove one key.
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key under a prefix, returning how many were dropped.
    fn delete_by_prefix(&self, prefix: &str) -> Result<usize>;
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory TTL cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.remove(key);
        Ok(())
    }

    fn delete_by_prefix(&self, prefix: &str) -> Result<usize> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let cache = MemoryCache::new();
        cache.set("t1:query:abc", "{}", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("t1:query:abc").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").unwrap().is_none());
    }

    #[test]
    fn prefix_delete_scopes_to_tenant() {
        let cache = MemoryCache::new();
        cache.set("t1:query:a", "1", Duration::from_secs(60)).unwrap();
        cache.set("t1:query:b", "2", Duration::from_secs(60)).unwrap();
        cache.set("t2:query:a", "3", Duration::from_secs(60)).unwrap();
        let dropped = cache.delete_by_prefix("t1:").unwrap();
        assert_eq!(dropped, 2);
        assert!(cache.get("t2:query:a").unwrap().is_some());
    }
}
