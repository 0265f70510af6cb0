//! In-memory repository.
//!
//! Documents live in a shared map; query-building state is per instance, so
//! a clone queries the same data with its own criteria stack.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Value, json};
use tracing::debug;

use super::{Criteria, Document, Model, Repository, WriteOutcome, describe};
use crate::error::RepositoryError;

/// Repository backed by process memory.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    model: Model,
    records: Arc<RwLock<BTreeMap<u64, Document>>>,
    /// Number of reads executed against `records`, shared by clones.
    queries: Arc<AtomicU64>,
    criteria: Vec<Arc<dyn Criteria>>,
    /// Criteria already applied to the current query.
    query: Vec<Arc<dyn Criteria>>,
    selected: Vec<String>,
    skip_criteria: bool,
    use_cache: bool,
}

impl InMemoryRepository {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            records: Arc::new(RwLock::new(BTreeMap::new())),
            queries: Arc::new(AtomicU64::new(0)),
            criteria: Vec::new(),
            query: Vec::new(),
            selected: Vec::new(),
            skip_criteria: false,
            use_cache: true,
        }
    }

    /// Number of reads that reached the underlying data.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    fn check_supported(&self, criteria: &dyn Criteria) -> Result<(), RepositoryError> {
        if criteria.supports(&self.model) {
            Ok(())
        } else {
            Err(RepositoryError::WrongCriteria {
                criteria: criteria.identifier().to_string(),
                model: self.model.name.clone(),
            })
        }
    }

    fn record_id(&self, document: &Document) -> Option<u64> {
        document.get(&self.model.primary_key).and_then(Value::as_u64)
    }

    fn project(&self, document: Document) -> Document {
        if self.selected.is_empty() {
            return document;
        }

        document
            .into_iter()
            .filter(|(field, _)| *field == self.model.primary_key || self.selected.contains(field))
            .collect()
    }

    /// Run the current query, then reset query-building state.
    fn execute(&mut self, extra: Option<&dyn Criteria>) -> Vec<Document> {
        self.apply_criteria();
        self.queries.fetch_add(1, Ordering::SeqCst);

        let documents: Vec<Document> = self.records.read().values().cloned().collect();
        let mut documents = self
            .query
            .iter()
            .fold(documents, |docs, criteria| criteria.apply(docs));
        if let Some(criteria) = extra {
            documents = criteria.apply(documents);
        }

        let documents: Vec<Document> = documents.into_iter().map(|d| self.project(d)).collect();
        self.reset_model();
        documents
    }
}

fn describe_stack(stack: &[Arc<dyn Criteria>]) -> Vec<Value> {
    stack.iter().map(|c| describe(c.as_ref())).collect()
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn model(&self) -> &Model {
        &self.model
    }

    fn table(&self) -> &str {
        &self.model.table
    }

    fn primary_key(&self) -> &str {
        &self.model.primary_key
    }

    fn select(&mut self, fields: Vec<String>) -> &mut Self {
        self.selected = fields;
        self
    }

    fn criteria(&self) -> &[Arc<dyn Criteria>] {
        &self.criteria
    }

    fn push_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<&mut Self, RepositoryError> {
        self.check_supported(criteria.as_ref())?;
        self.criteria.push(criteria);
        Ok(self)
    }

    fn drop_criteria(&mut self, identifier: &str) -> &mut Self {
        self.criteria.retain(|c| c.identifier() != identifier);
        self
    }

    fn skip_criteria(&mut self, skip: bool) -> &mut Self {
        self.skip_criteria = skip;
        self
    }

    fn apply_criteria(&mut self) -> &mut Self {
        if self.skip_criteria {
            return self;
        }
        let pending = std::mem::take(&mut self.criteria);
        self.query.extend(pending);
        self
    }

    fn reset_model(&mut self) -> &mut Self {
        self.criteria.clear();
        self.query.clear();
        self.selected.clear();
        self.skip_criteria = false;
        self
    }

    fn is_use_cache(&self) -> bool {
        self.use_cache
    }

    fn with_cache(&mut self, use_cache: bool) -> &mut Self {
        self.use_cache = use_cache;
        self
    }

    fn query_fingerprint(&self) -> Value {
        json!({
            "criteria": describe_stack(&self.criteria),
            "applied": describe_stack(&self.query),
            "select": self.selected,
            "skip_criteria": self.skip_criteria,
        })
    }

    async fn get_by_criteria(&mut self, criteria: Arc<dyn Criteria>) -> Result<Vec<Document>, RepositoryError> {
        self.check_supported(criteria.as_ref())?;
        Ok(self.execute(Some(criteria.as_ref())))
    }

    async fn find(&mut self, id: u64) -> Result<Option<Document>, RepositoryError> {
        let primary_key = self.model.primary_key.clone();
        Ok(self
            .execute(None)
            .into_iter()
            .find(|doc| doc.get(&primary_key).and_then(Value::as_u64) == Some(id)))
    }

    async fn find_where(&mut self, conditions: Document) -> Result<Option<Document>, RepositoryError> {
        Ok(self.execute(None).into_iter().find(|doc| {
            conditions
                .iter()
                .all(|(field, value)| doc.get(field) == Some(value))
        }))
    }

    async fn get(&mut self) -> Result<Vec<Document>, RepositoryError> {
        Ok(self.execute(None))
    }

    async fn count(&mut self) -> Result<u64, RepositoryError> {
        Ok(self.execute(None).len() as u64)
    }

    async fn create(&self, mut attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError> {
        let mut records = self.records.write();

        let id = match self.record_id(&attributes) {
            Some(id) if records.contains_key(&id) => {
                return Ok(WriteOutcome::failure(format!("{} {} already exists", self.model.name, id)));
            }
            Some(id) => id,
            None => records.keys().next_back().map_or(1, |last| last + 1),
        };

        let now = Utc::now().to_rfc3339();
        attributes.insert(self.model.primary_key.clone(), json!(id));
        attributes.insert("created_at".to_string(), json!(now));
        attributes.insert("updated_at".to_string(), json!(now));
        records.insert(id, attributes.clone());

        debug!("Created {} {} in {}", self.model.name, id, self.model.table);
        Ok(WriteOutcome::Success(attributes))
    }

    async fn update(&self, id: u64, attributes: Document) -> Result<WriteOutcome<Document>, RepositoryError> {
        let mut records = self.records.write();

        let Some(record) = records.get_mut(&id) else {
            return Ok(WriteOutcome::failure(format!("{} {} not found", self.model.name, id)));
        };

        for (field, value) in attributes {
            if field != self.model.primary_key {
                record.insert(field, value);
            }
        }
        record.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        debug!("Updated {} {} in {}", self.model.name, id, self.model.table);
        Ok(WriteOutcome::Success(record.clone()))
    }

    async fn delete(&self, id: u64) -> Result<WriteOutcome<u64>, RepositoryError> {
        match self.records.write().remove(&id) {
            Some(_) => {
                debug!("Deleted {} {} from {}", self.model.name, id, self.model.table);
                Ok(WriteOutcome::Success(id))
            }
            None => Ok(WriteOutcome::failure(format!("{} {} not found", self.model.name, id))),
        }
    }
}
