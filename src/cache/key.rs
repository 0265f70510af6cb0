//! Cache key derivation.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// A group of cache entries that is invalidated as a whole.
///
/// Scoped by key store so two stores never flush each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    key_store: String,
    name: String,
}

impl Namespace {
    pub fn new(key_store: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key_store: key_store.into(),
            name: name.into(),
        }
    }

    pub fn key_store(&self) -> &str {
        &self.key_store
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_store, self.name)
    }
}

/// A key identifying one `(method, arguments)` read result.
///
/// Rendered as `{key_store}:{namespace}:{method}:{digest}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    method: String,
    digest: String,
}

impl CacheKey {
    /// Derive a key from a method name and its arguments.
    ///
    /// Arguments are serialized to JSON before hashing. `serde_json` maps are
    /// ordered by key, so the digest does not depend on insertion order and
    /// stays stable across process restarts.
    pub fn derive<A>(namespace: &Namespace, method: &str, arguments: &A) -> Result<Self, CacheError>
    where
        A: Serialize + ?Sized,
    {
        let canonical = serde_json::to_vec(&serde_json::to_value(arguments)?)?;
        let digest = hex::encode(Sha256::digest(&canonical));

        Ok(Self {
            namespace: namespace.clone(),
            method: method.to_string(),
            digest,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.method, self.digest)
    }
}
