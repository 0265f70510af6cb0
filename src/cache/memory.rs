//! In-memory cache store built on Moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use tracing::debug;

use super::{CacheKey, CacheStore, KeyRegistry, Namespace};
use crate::error::CacheError;

/// Default maximum number of entries.
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// A stored payload together with the TTL it was written with.
#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Arc<[u8]>,
    ttl: Option<Duration>,
    namespace: Namespace,
}

/// Per-entry expiry: every write carries its own TTL.
struct EntryExpiry;

impl Expiry<String, StoredValue> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// A cache store that keeps payloads in process memory.
///
/// This store is:
/// - Thread-safe (uses Arc internally)
/// - Bounded, with LRU-style eviction past `max_capacity`
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
#[derive(Clone)]
pub struct MemoryCacheStore {
    inner: Arc<Cache<String, StoredValue>>,
    keys: KeyRegistry,
}

impl MemoryCacheStore {
    /// Create a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a store with the given max capacity.
    ///
    /// Entries evicted by expiry or capacity are dropped from the key
    /// registry as well, so it never outgrows the cache.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let keys = KeyRegistry::new();
        let registry = keys.clone();

        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .eviction_listener(move |key: Arc<String>, value: StoredValue, cause: RemovalCause| {
                if cause.was_evicted() {
                    registry.forget(&value.namespace, key.as_str());
                }
            })
            .build();

        Self {
            inner: Arc::new(inner),
            keys,
        }
    }

    /// Check if a live entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains_key(&key.to_string())
    }

    /// Get the number of entries in the store.
    ///
    /// Note: This may not be perfectly accurate due to concurrent operations.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    /// Get the registry of recorded keys.
    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self
            .inner
            .get(&key.to_string())
            .map(|value| value.bytes.to_vec()))
    }

    async fn put(
        &self,
        key: &CacheKey,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let rendered = key.to_string();
        self.inner.insert(
            rendered.clone(),
            StoredValue {
                bytes: value.into(),
                ttl,
                namespace: key.namespace().clone(),
            },
        );
        // Record after inserting: replacing an expired entry notifies the
        // listener, which would otherwise forget the live key.
        self.keys.record(key.namespace(), rendered);
        Ok(())
    }

    async fn flush(&self, namespace: &Namespace) -> Result<u64, CacheError> {
        let keys = self.keys.take(namespace);
        for key in &keys {
            self.inner.invalidate(key);
        }

        debug!("Flushed {} keys from {}", keys.len(), namespace);
        Ok(keys.len() as u64)
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entry_count", &self.inner.entry_count())
            .field("keys", &self.keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(namespace: &Namespace, id: u64) -> CacheKey {
        CacheKey::derive(namespace, "find", &json!([id])).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryCacheStore::new();
        let ns = Namespace::new("repository", "post.posts");
        let k = key(&ns, 1);

        assert!(store.get(&k).await.unwrap().is_none());

        store.put(&k, b"payload".to_vec(), None).await.unwrap();

        assert_eq!(store.get(&k).await.unwrap(), Some(b"payload".to_vec()));
        assert!(store.contains(&k));
        assert!(store.keys().contains(&ns, &k.to_string()));
    }

    #[tokio::test]
    async fn test_flush_only_touches_its_namespace() {
        let store = MemoryCacheStore::new();
        let posts = Namespace::new("repository", "post.posts");
        let users = Namespace::new("repository", "user.users");

        store.put(&key(&posts, 1), b"1".to_vec(), None).await.unwrap();
        store.put(&key(&posts, 2), b"2".to_vec(), None).await.unwrap();
        store.put(&key(&users, 1), b"u".to_vec(), None).await.unwrap();

        assert_eq!(store.flush(&posts).await.unwrap(), 2);

        assert!(store.get(&key(&posts, 1)).await.unwrap().is_none());
        assert!(store.get(&key(&posts, 2)).await.unwrap().is_none());
        assert!(store.get(&key(&users, 1)).await.unwrap().is_some());
        assert_eq!(store.flush(&posts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entries_expire_with_their_own_ttl() {
        let store = MemoryCacheStore::new();
        let ns = Namespace::new("repository", "post.posts");

        store
            .put(&key(&ns, 1), b"short".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.put(&key(&ns, 2), b"forever".to_vec(), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(store.get(&key(&ns, 1)).await.unwrap().is_none());
        assert!(store.get(&key(&ns, 2)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_keys_leave_the_registry() {
        let store = MemoryCacheStore::with_capacity(10);
        let ns = Namespace::new("repository", "post.posts");

        for id in 0..100 {
            store
                .put(&key(&ns, id), b"x".to_vec(), Some(Duration::from_millis(5)))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.entry_count();

        assert!(store.keys().key_count(&ns) <= 10);
    }

    #[tokio::test]
    async fn test_registry_tracks_capacity_evictions() {
        let store = MemoryCacheStore::with_capacity(10);
        let ns = Namespace::new("repository", "post.posts");

        for id in 0..100 {
            store.put(&key(&ns, id), b"x".to_vec(), None).await.unwrap();
        }
        store.entry_count();

        assert!(store.keys().key_count(&ns) <= 10);
    }
}
