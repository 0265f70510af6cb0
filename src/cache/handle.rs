//! Cache handle - the decorator's view of a cache store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{CacheConfig, CacheKey, CacheStore, Namespace};
use crate::error::CacheError;

/// Namespace used until a handle is bound to a repository.
const UNBOUND_NAMESPACE: &str = "unbound";

/// Configuration state for caching one repository.
///
/// Holds the target namespace, the TTL applied to new entries and the
/// injected store. Store failures never surface from a handle: reads fall
/// back to computing the value and writes to the store are skipped.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
    namespace: Namespace,
    ttl: Option<Duration>,
}

impl CacheHandle {
    /// Create a handle over `store` using `config`.
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            namespace: Namespace::new(config.key_store.clone(), UNBOUND_NAMESPACE),
            ttl: config.ttl,
        }
    }

    /// Bind the handle to the identity of the cached object.
    pub fn set_cache_object(&mut self, identity: impl Into<String>) -> &mut Self {
        self.namespace = Namespace::new(self.namespace.key_store().to_string(), identity);
        self
    }

    /// Set the TTL used for subsequent writes. `None` stores forever.
    pub fn set_cache_lifetime(&mut self, ttl: Option<Duration>) -> &mut Self {
        self.ttl = ttl;
        self
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Derive the key for a `(method, arguments)` pair in this namespace.
    pub fn set_cache_key<A>(&self, method: &str, arguments: &A) -> Result<CacheKey, CacheError>
    where
        A: Serialize + ?Sized,
    {
        CacheKey::derive(&self.namespace, method, arguments)
    }

    /// Return the value cached under `key`, or compute and store it.
    ///
    /// Errors from `compute` propagate and are never cached. Not atomic with
    /// [`flush_cache`](Self::flush_cache): a flush that lands while `compute`
    /// runs is overwritten by the value stored afterwards.
    pub async fn retrieve_from_cache<T, E, F, Fut>(&self, key: &CacheKey, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    debug!("Cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
            },
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => warn!("Cache read failed for {}, executing directly: {}", key, e),
        }

        let value = compute().await?;
        self.store_value(key, &value).await;
        Ok(value)
    }

    async fn store_value<T: Serialize + Sync>(&self, key: &CacheKey, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping cache write for {}: {}", key, e);
                return;
            }
        };

        match self.store.put(key, bytes, self.ttl).await {
            Ok(()) => debug!("Cached {} (ttl: {:?})", key, self.ttl),
            Err(e) => warn!("Cache write failed for {}: {}", key, e),
        }
    }

    /// Invalidate every entry in this handle's namespace.
    ///
    /// Returns the number of keys flushed, or 0 if the store failed.
    pub async fn flush_cache(&self) -> u64 {
        match self.store.flush(&self.namespace).await {
            Ok(flushed) => {
                debug!("Flushed {} cache entries from {}", flushed, self.namespace);
                flushed
            }
            Err(e) => {
                warn!("Cache flush failed for {}: {}", self.namespace, e);
                0
            }
        }
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("namespace", &self.namespace)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::cache::testing::FailingStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle(store: Arc<dyn CacheStore>) -> CacheHandle {
        let mut handle = CacheHandle::new(store, &CacheConfig::default());
        handle.set_cache_object("post.posts");
        handle
    }

    #[test]
    fn test_namespace_follows_cache_object() {
        let config = CacheConfig::default().key_store("archive");
        let mut handle = CacheHandle::new(Arc::new(MemoryCacheStore::new()), &config);

        assert_eq!(handle.namespace().to_string(), "archive:unbound");

        handle.set_cache_object("post.posts");
        assert_eq!(handle.namespace().to_string(), "archive:post.posts");
    }

    #[tokio::test]
    async fn test_retrieve_computes_once() {
        let handle = handle(Arc::new(MemoryCacheStore::new()));
        let key = handle.set_cache_key("find", &json!([5])).unwrap();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<String, ()> = handle
                .retrieve_from_cache(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("A".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "A");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compute_errors_are_not_cached() {
        let handle = handle(Arc::new(MemoryCacheStore::new()));
        let key = handle.set_cache_key("find", &json!([5])).unwrap();

        let failed: Result<String, &str> = handle
            .retrieve_from_cache(&key, || async { Err("boom") })
            .await;
        assert_eq!(failed, Err("boom"));

        let value: Result<String, &str> = handle
            .retrieve_from_cache(&key, || async { Ok("fresh".to_string()) })
            .await;
        assert_eq!(value, Ok("fresh".to_string()));
    }

    #[tokio::test]
    async fn test_failing_store_degrades_to_direct_execution() {
        let handle = handle(Arc::new(FailingStore));
        let key = handle.set_cache_key("find", &json!([5])).unwrap();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<u64, ()> = handle
                .retrieve_from_cache(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(handle.flush_cache().await, 0);
    }

    #[tokio::test]
    async fn test_lifetime_override_applies_to_new_entries() {
        let store = Arc::new(MemoryCacheStore::new());
        let mut handle = handle(store.clone());
        handle.set_cache_lifetime(Some(Duration::from_millis(20)));

        let key = handle.set_cache_key("find", &json!([1])).unwrap();
        let _: Result<u64, ()> = handle.retrieve_from_cache(&key, || async { Ok(1) }).await;

        handle.set_cache_lifetime(None);
        let stable = handle.set_cache_key("find", &json!([2])).unwrap();
        let _: Result<u64, ()> = handle.retrieve_from_cache(&stable, || async { Ok(2) }).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(!store.contains(&key));
        assert!(store.contains(&stable));
    }
}
