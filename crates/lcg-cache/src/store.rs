//! Cache store trait and the moka-backed default implementation

use crate::error::CacheError;
use crate::key::CacheKey;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Key/value store with per-key TTL
///
/// Values are serialized RAG results. Implementations must never surface
/// partial values: an entry is returned whole or not at all.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a value; `None` is a miss
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Store a value with the given time-to-live
    async fn set(&self, key: CacheKey, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Drop a single entry
    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Administrative process-wide flush; not part of the normal flow
    async fn flush(&self) -> Result<(), CacheError>;

    /// Current statistics
    fn stats(&self) -> CacheStats;
}

/// Expiry policy reading the TTL attached to each entry at insert time
struct PerEntryTtl;

impl Expiry<CacheKey, (String, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &(String, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// Moka-backed cache store
///
/// Stores serialized results with:
/// - Per-entry TTL expiration
/// - LRU eviction under the capacity bound
/// - Lock-free concurrent access across workers
#[derive(Debug, Clone)]
pub struct MokaCacheStore {
    inner: Cache<CacheKey, (String, Duration)>,
}

impl MokaCacheStore {
    /// Create a store with the given capacity bound
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for MokaCacheStore {
    /// Create a store with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        Ok(self.inner.get(key).await.map(|(value, _ttl)| value))
    }

    async fn set(&self, key: CacheKey, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.insert(key, (value, ttl)).await;
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        tracing::info!("flushing cache store");
        self.inner.invalidate_all();
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CacheKey {
        CacheKey::derive(s, [], "test-model")
    }

    #[tokio::test]
    async fn set_and_get() {
        let store = MokaCacheStore::new(100);
        let k = key("query");

        store
            .set(k.clone(), "answer".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        let value = store.get(&k).await.unwrap();
        assert_eq!(value.as_deref(), Some("answer"));
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let store = MokaCacheStore::new(100);
        assert!(store.get(&key("absent")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let store = MokaCacheStore::new(100);
        let k = key("short-lived");

        store
            .set(k.clone(), "v".to_string(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(store.get(&k).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let store = MokaCacheStore::new(100);
        let k = key("query");

        store
            .set(k.clone(), "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        store.invalidate(&k).await.unwrap();

        assert!(store.get(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn flush_empties_the_store() {
        let store = MokaCacheStore::new(100);

        for i in 0..5 {
            store
                .set(
                    key(&format!("query {i}")),
                    format!("answer {i}"),
                    Duration::from_secs(60),
                )
                .await
                .unwrap();
        }

        store.flush().await.unwrap();
        for i in 0..5 {
            assert!(store.get(&key(&format!("query {i}"))).await.unwrap().is_none());
        }
    }
}
