//! Cache configuration.

use std::time::Duration;

/// Default lifetime for cached repository reads.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(300);

/// Default key-store location.
pub const DEFAULT_KEY_STORE: &str = "repository";

/// Configuration for a cache handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Time-to-live for cache entries.
    /// `None` means entries never expire.
    pub ttl: Option<Duration>,

    /// Location where generated keys are recorded for bulk invalidation.
    /// Handles sharing a key store and a namespace share their entries.
    pub key_store: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_LIFETIME), // 5 minutes
            key_store: DEFAULT_KEY_STORE.to_string(),
        }
    }
}

impl CacheConfig {
    /// Set time-to-live for cache entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = Some(duration);
        self
    }

    /// Disable TTL (entries never expire based on time).
    #[must_use]
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Set the key-store location.
    #[must_use]
    pub fn key_store(mut self, key_store: impl Into<String>) -> Self {
        self.key_store = key_store.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CacheConfig::default()
            .ttl(Duration::from_secs(60))
            .key_store("posts");

        assert_eq!(config.ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.key_store, "posts");
        assert_eq!(CacheConfig::default().no_ttl().ttl, None);
    }
}
