//! Query criteria.
//!
//! A criteria is a composable filter pushed onto a repository before a read.
//! Its `fingerprint` feeds into cache keys, so two criteria with the same
//! identifier and fingerprint must select the same documents.

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Value, json};

use super::{Document, Model};

/// A composable query filter.
pub trait Criteria: Send + Sync + fmt::Debug {
    /// Stable name of this kind of criteria, used by `drop_criteria`.
    fn identifier(&self) -> &str;

    /// The parameters of this criteria as JSON.
    fn fingerprint(&self) -> Value;

    /// Whether this criteria can be applied to `model`.
    fn supports(&self, _model: &Model) -> bool {
        true
    }

    /// Apply this criteria to a result set.
    fn apply(&self, documents: Vec<Document>) -> Vec<Document>;
}

/// Describe a criteria for use in cache keys and fingerprints.
pub fn describe(criteria: &dyn Criteria) -> Value {
    json!({
        "criteria": criteria.identifier(),
        "parameters": criteria.fingerprint(),
    })
}

/// Keep documents whose `field` equals `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereEquals {
    field: String,
    value: Value,
    model: Option<String>,
}

impl WhereEquals {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            model: None,
        }
    }

    /// Restrict this criteria to one model.
    #[must_use]
    pub fn for_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

impl Criteria for WhereEquals {
    fn identifier(&self) -> &str {
        "where_equals"
    }

    fn fingerprint(&self) -> Value {
        json!({ "field": self.field, "value": self.value })
    }

    fn supports(&self, model: &Model) -> bool {
        self.model.as_deref().is_none_or(|name| name == model.name)
    }

    fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        documents
            .into_iter()
            .filter(|doc| doc.get(&self.field) == Some(&self.value))
            .collect()
    }
}

/// Keep documents whose `field` is one of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereIn {
    field: String,
    values: Vec<Value>,
}

impl WhereIn {
    pub fn new<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Criteria for WhereIn {
    fn identifier(&self) -> &str {
        "where_in"
    }

    fn fingerprint(&self) -> Value {
        json!({ "field": self.field, "values": self.values })
    }

    fn apply(&self, documents: Vec<Document>) -> Vec<Document> {
        documents
            .into_iter()
            .filter(|doc| doc.get(&self.field).is_some_and(|v| self.values.contains(v)))
            .collect()
    }
}

/// Sort documents by `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    field: String,
    descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl Criteria for OrderBy {
    fn identifier(&self) -> &str {
        "order_by"
    }

    fn fingerprint(&self) -> Value {
        json!({ "field": self.field, "descending": self.descending })
    }

    fn apply(&self, mut documents: Vec<Document>) -> Vec<Document> {
        documents.sort_by(|a, b| {
            let ordering = compare_values(a.get(&self.field), b.get(&self.field));
            if self.descending { ordering.reverse() } else { ordering }
        });
        documents
    }
}

/// Order JSON values: missing/null first, then bools, numbers, strings.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
