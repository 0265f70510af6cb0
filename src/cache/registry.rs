//! Key registry - records generated keys per namespace.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::Namespace;

/// Records which keys were written under which namespace.
///
/// Stores use the registry to flush a whole namespace without scanning
/// every entry. Cloning is cheap and shares the same underlying map.
#[derive(Clone, Default)]
pub struct KeyRegistry {
    scopes: Arc<DashMap<Namespace, HashSet<String>>>,
}

impl KeyRegistry {
    /// Create a new empty key registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key under a namespace.
    pub fn record(&self, namespace: &Namespace, key: impl Into<String>) {
        self.scopes
            .entry(namespace.clone())
            .or_default()
            .insert(key.into());
    }

    /// Remove and return every key recorded under a namespace.
    pub fn take(&self, namespace: &Namespace) -> HashSet<String> {
        let keys = self
            .scopes
            .remove(namespace)
            .map(|(_, keys)| keys)
            .unwrap_or_default();

        if !keys.is_empty() {
            debug!("Released {} keys from {}", keys.len(), namespace);
        }
        keys
    }

    /// Forget a single key, dropping the namespace once it has no keys left.
    pub fn forget(&self, namespace: &Namespace, key: &str) {
        self.scopes.remove_if_mut(namespace, |_, keys| {
            keys.remove(key);
            keys.is_empty()
        });
    }

    /// Check if a key is recorded under a namespace.
    pub fn contains(&self, namespace: &Namespace, key: &str) -> bool {
        self.scopes
            .get(namespace)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Get the number of keys recorded under a namespace.
    pub fn key_count(&self, namespace: &Namespace) -> usize {
        self.scopes.get(namespace).map_or(0, |keys| keys.len())
    }

    /// Get the number of namespaces with recorded keys.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let namespaces: Vec<String> = self.scopes.iter().map(|e| e.key().to_string()).collect();
        f.debug_struct("KeyRegistry")
            .field("namespace_count", &namespaces.len())
            .field("namespaces", &namespaces)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_releases_only_one_namespace() {
        let registry = KeyRegistry::new();
        let posts = Namespace::new("repository", "post.posts");
        let users = Namespace::new("repository", "user.users");

        registry.record(&posts, "a");
        registry.record(&posts, "b");
        registry.record(&posts, "a");
        registry.record(&users, "c");

        assert_eq!(registry.key_count(&posts), 2);
        assert_eq!(registry.len(), 2);

        let taken = registry.take(&posts);
        assert_eq!(taken.len(), 2);
        assert!(taken.contains("a") && taken.contains("b"));

        assert!(!registry.contains(&posts, "a"));
        assert!(registry.contains(&users, "c"));
        assert!(registry.take(&posts).is_empty());
    }

    #[test]
    fn test_key_store_scopes_namespaces() {
        let registry = KeyRegistry::new();
        let live = Namespace::new("repository", "post.posts");
        let archive = Namespace::new("archive", "post.posts");

        registry.record(&live, "k");
        registry.take(&archive);

        assert!(registry.contains(&live, "k"));
    }

    #[test]
    fn test_forget_drops_empty_namespaces() {
        let registry = KeyRegistry::new();
        let posts = Namespace::new("repository", "post.posts");

        registry.record(&posts, "a");
        registry.record(&posts, "b");

        registry.forget(&posts, "a");
        assert_eq!(registry.key_count(&posts), 1);

        registry.forget(&posts, "b");
        registry.forget(&posts, "missing");
        assert!(registry.is_empty());
    }
}
