//! Caching decorator for repositories.
//!
//! `CachingRepository` wraps any [`Repository`] and implements the same
//! trait. Query-building and introspection calls go straight to the wrapped
//! repository. Reads go through [`CachingRepository::before_get`], which
//! serves them from the cache store when possible. Writes go through
//! [`CachingRepository::after_update`], which flushes the decorator's whole
//! namespace once a write succeeds.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = Arc::new(MemoryCacheStore::new());
//! let mut posts = CachingRepository::new(repository, store, &CacheConfig::default());
//!
//! posts.push_criteria(Arc::new(WhereEquals::new("status", "published")))?;
//! let published = posts.get().await?; // cached
//! posts.update(5, attributes).await?; // flushes on success
//! ```

mod policy;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheHandle, CacheStore};
use crate::error::RepositoryError;
use crate::repository::{
    Criteria, Document, Model, Repository, RepositoryFuture, WriteOutcome, describe,
};

pub use policy::FlushPolicy;

/// A repository whose reads are cached and whose writes invalidate.
#[derive(Debug, Clone)]
pub struct CachingRepository<R> {
    repository: R,
    cache: CacheHandle,
}

impl<R: Repository> CachingRepository<R> {
    /// Wrap `repository`, caching into `store`.
    ///
    /// The cache namespace is derived from the repository's model.
    pub fn new(repository: R, store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        let mut cache = CacheHandle::new(store, config);
        cache.set_cache_object(repository.model().cache_namespace());
        debug!("Caching {} through {}", repository.table(), cache.namespace());

        Self { repository, cache }
    }

    /// Get the wrapped repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// Unwrap the decorator, returning the wrapped repository.
    pub fn into_inner(self) -> R {
        self.repository
    }

    /// Get the cache handle.
    pub fn cache_instance(&self) -> &CacheHandle {
        &self.cache
    }

    /// Set the TTL for entries cached from now on. `None` caches forever.
    pub fn set_cache_lifetime(&mut self, ttl: Option<Duration>) -> &mut Self {
        self.cache.set_cache_lifetime(ttl);
        self
    }

    /// Run a read through the cache.
    ///
    /// The wrapped repository is cloned first, so `call` runs against the
    /// query state active at call time, and the live repository is reset
    /// before the cache is consulted. The clone's query fingerprint is part
    /// of the key. `call` only runs on a miss.
    pub async fn before_get<T, A, F, Fut>(
        &mut self,
        method: &str,
        arguments: &A,
        call: F,
    ) -> Result<T, RepositoryError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        A: Serialize + Sync + ?Sized,
        F: FnOnce(R) -> Fut + Send,
        Fut: Future<Output = Result<T, RepositoryError>> + Send,
    {
        let repository = self.repository.clone();

        let key = if repository.is_use_cache() {
            match self
                .cache
                .set_cache_key(method, &(arguments, repository.query_fingerprint()))
            {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!("Bypassing cache for {}: {}", method, e);
                    None
                }
            }
        } else {
            None
        };

        self.repository.reset_model();

        match key {
            Some(key) => {
                self.cache
                    .retrieve_from_cache(&key, move || call(repository))
                    .await
            }
            None => call(repository).await,
        }
    }

    /// Run a write against the wrapped repository, then flush per `policy`.
    ///
    /// The result is returned unchanged, whether or not the flush happened
    /// or succeeded.
    pub async fn after_update<'a, T, F>(
        &'a self,
        method: &str,
        policy: FlushPolicy,
        call: F,
    ) -> Result<WriteOutcome<T>, RepositoryError>
    where
        T: Send,
        F: FnOnce(&'a R) -> RepositoryFuture<'a, WriteOutcome<T>> + Send,
    {
        let result = call(&self.repository).await;
        let succeeded = matches!(result, Ok(WriteOutcome::Success(_)));

        if policy.should_flush(succeeded) {
            let flushed = self.cache.flush_cache().await;
            debug!("{} flushed {} entries from {}", method, flushed, self.cache.namespace());
        } else {
            debug!("{} left {} intact", method, self.cache.namespace());
        }

        result
    }

    pub async fn create_with(
        &self,
        attributes: Document,
        policy: FlushPolicy,
    ) -> Result<WriteOutcome<Document>, RepositoryError> {
        self.after_update("create", policy, move |repository| repository.create(attributes))
            .await
    }

    pub async fn update_with(
        &self,
        id: u64,
        attributes: Document,
        policy: FlushPolicy,
    ) -> Result<WriteOutcome<Document>, RepositoryError> {
        self.after_update("update", policy, move |repository| {
            repository.update(id, attributes)
        })
        .await
    }

    pub async fn delete_with(
        &self,
        id: u64,
        policy: FlushPolicy,
    ) -> Result<WriteOutcome<u64>, RepositoryError> {
        self.after_update("delete", policy, move |repository| repository.delete(id))
            .await
    }
}

#[async_trait]
impl<R: Repository> Repository for CachingRepository<R> {
    fn model(&self) -> &Model {
        self.repository.model()
    }

    fn table(&self) -> &str {
        self.repository.table()
    }

    fn primary_key(&self) -> &str {
        self.repository.primary_key()
    }

    fn select(&mut self, fields: Vec<String>) -> &mut Self {
        self.repository.select(fields);
        self
    }

    fn criteria(&self) -> &[Arc<dyn Criteria>] {
        self.repository.criteria()
    }

    fn push_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<&mut Self, RepositoryError> {
        self.repository.push_criteria(criteria)?;
        Ok(self)
    }

    fn drop_criteria(&mut self, identifier: &str) -> &mut Self {
        self.repository.drop_criteria(identifier);
        self
    }

    fn skip_criteria(&mut self, skip: bool) -> &mut Self {
        self.repository.skip_criteria(skip);
        self
    }

    fn apply_criteria(&mut self) -> &mut Self {
        self.repository.apply_criteria();
        self
    }

    fn reset_model(&mut self) -> &mut Self {
        self.repository.reset_model();
        self
    }

    fn is_use_cache(&self) -> bool {
        self.repository.is_use_cache()
    }

    fn with_cache(&mut self, use_cache: bool) -> &mut Self {
        self.repository.with_cache(use_cache);
        self
    }

    fn query_fingerprint(&self) -> Value {
        self.repository.query_fingerprint()
    }

    async fn get_by_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<Vec<Document>, RepositoryError> {
        let model = self.repository.model();
        if !criteria.supports(model) {
            return Err(RepositoryError::WrongCriteria {
                criteria: criteria.identifier().to_string(),
                model: model.name.clone(),
            });
        }

        let arguments = [describe(criteria.as_ref())];
        self.before_get("get_by_criteria", &arguments, move |mut repository| async move {
            repository.get_by_criteria(criteria).await
        })
        .await
    }

    async fn find(&mut self, id: u64) -> Result<Option<Document>, RepositoryError> {
        self.before_get("find", &[id], move |mut repository| async move {
            repository.find(id).await
        })
        .await
    }

    async fn find_where(&mut self, conditions: Document) -> Result<Option<Document>, RepositoryError> {
        let arguments = [Value::Object(conditions.clone())];
        self.before_get("find_where", &arguments, move |mut repository| async move {
            repository.find_where(conditions).await
        })
        .await
    }

    async fn get(&mut self) -> Result<Vec<Document>, RepositoryError> {
        self.before_get("get", &(), |mut repository| async move { repository.get().await })
            .await
    }

    async fn count(&mut self) -> Result<u64, RepositoryError> {
        self.before_get("count", &(), |mut repository| async move { repository.count().await })
            .await
    }

    async fn create(&self, attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError> {
        self.create_with(attributes, FlushPolicy::default()).await
    }

    async fn update(&self, id: u64, attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError> {
        self.update_with(id, attributes, FlushPolicy::default()).await
    }

    async fn delete(&self, id: u64) -> Result<WriteOutcome<u64>, RepositoryError> {
        self.delete_with(id, FlushPolicy::default()).await
    }
}
