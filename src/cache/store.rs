//! Cache store trait.

use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, Namespace};
use crate::error::CacheError;

/// Key/value storage backing a cache handle.
///
/// Values are opaque serialized payloads. Implementations may live out of
/// process, so every operation is fallible and asynchronous.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the payload stored under `key`, if present and not expired.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a payload under `key`. `None` TTL means the entry never expires.
    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Invalidate every entry written under `namespace`.
    ///
    /// Returns the number of keys invalidated.
    async fn flush(&self, namespace: &Namespace) -> Result<u64, CacheError>;
}
