//! Repository module - the data access contract.
//!
//! A repository exposes introspection, a fluent query-building surface
//! (selected fields and a criteria stack), reads and writes. The caching
//! decorator implements the same trait, so callers never need to know
//! whether caching is involved.

mod criteria;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RepositoryError;

pub use criteria::{Criteria, OrderBy, WhereEquals, WhereIn, describe};
pub use memory::InMemoryRepository;

/// A record as stored by a repository.
pub type Document = serde_json::Map<String, Value>;

/// A boxed repository operation, as returned by `Repository` methods.
pub type RepositoryFuture<'a, T> = BoxFuture<'a, Result<T, RepositoryError>>;

/// Convert a JSON object into a document.
///
/// Non-object values yield an empty document.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Identity of the records a repository manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub table: String,
    pub primary_key: String,
}

impl Model {
    /// Create a model with the conventional `id` primary key.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    /// Namespace for cache entries derived from this model.
    pub fn cache_namespace(&self) -> String {
        format!("{}.{}", self.name, self.table)
    }
}

/// Result of a write operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum WriteOutcome<T> {
    /// The write was applied.
    Success(T),
    /// The write was rejected; nothing changed.
    Failure { reason: String },
}

impl<T> WriteOutcome<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }
}

/// Queryable and mutable access to a collection of documents.
///
/// Query-building methods mutate transient state consumed by the next read.
/// `Clone` must produce an independent copy of that state (sharing the
/// underlying data), which is how a read snapshots call-time state.
#[async_trait]
pub trait Repository: Clone + Send + Sync {
    fn model(&self) -> &Model;

    fn table(&self) -> &str;

    fn primary_key(&self) -> &str;

    /// Restrict results to `fields`.
    fn select(&mut self, fields: Vec<String>) -> &mut Self;

    /// The criteria stack.
    fn criteria(&self) -> &[Arc<dyn Criteria>];

    /// Push a criteria onto the stack.
    ///
    /// Fails with `WrongCriteria` if the criteria does not support the model.
    fn push_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<&mut Self, RepositoryError>;

    /// Remove every stacked criteria with `identifier`.
    fn drop_criteria(&mut self, identifier: &str) -> &mut Self;

    fn skip_criteria(&mut self, skip: bool) -> &mut Self;

    /// Apply the criteria stack to the current query.
    fn apply_criteria(&mut self) -> &mut Self;

    /// Clear all query-building state.
    fn reset_model(&mut self) -> &mut Self;

    fn is_use_cache(&self) -> bool;

    fn with_cache(&mut self, use_cache: bool) -> &mut Self;

    /// A JSON description of the current query-building state.
    fn query_fingerprint(&self) -> Value;

    async fn get_by_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<Vec<Document>, RepositoryError>;

    async fn find(&mut self, id: u64) -> Result<Option<Document>, RepositoryError>;

    /// First document whose fields equal every entry of `conditions`.
    async fn find_where(&mut self, conditions: Document) -> Result<Option<Document>, RepositoryError>;

    async fn get(&mut self) -> Result<Vec<Document>, RepositoryError>;

    async fn count(&mut self) -> Result<u64, RepositoryError>;

    async fn create(&self, attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError>;

    async fn update(&self, id: u64, attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError>;

    async fn delete(&self, id: u64) -> Result<WriteOutcome<u64>, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_outcome_serializes_tagged() {
        let ok: WriteOutcome<u64> = WriteOutcome::Success(5);
        let failed: WriteOutcome<u64> = WriteOutcome::failure("record 5 not found");

        assert_eq!(serde_json::to_value(&failed).unwrap()["status"], "failure");
        assert!(ok.is_success());
        assert!(!failed.is_success());
        assert_eq!(ok.into_success(), Some(5));
    }

    #[test]
    fn test_model_namespace() {
        let model = Model::new("post", "posts").with_primary_key("post_id");
        assert_eq!(model.cache_namespace(), "post.posts");
        assert_eq!(model.primary_key, "post_id");
    }

    #[test]
    fn test_document_from_non_object() {
        assert!(document(json!([1, 2])).is_empty());
        assert_eq!(document(json!({ "a": 1 }))["a"], 1);
    }
}
