//! Cache store doubles for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{CacheKey, CacheStore, MemoryCacheStore, Namespace};
use crate::error::CacheError;

/// A store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _key: &CacheKey, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn flush(&self, _namespace: &Namespace) -> Result<u64, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// A memory store that counts calls per operation.
#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryCacheStore,
    gets: AtomicUsize,
    puts: AtomicUsize,
    flushes: AtomicUsize,
}

impl RecordingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.gets() + self.puts() + self.flushes()
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value, ttl).await
    }

    async fn flush(&self, namespace: &Namespace) -> Result<u64, CacheError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush(namespace).await
    }
}
