//! Configuration module for repocache.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_KEY_STORE, DEFAULT_LIFETIME, DEFAULT_MAX_CAPACITY};
use crate::error::ConfigError;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Lifetime of cached repository reads. `None` caches forever.
    pub cache_lifetime: Option<Duration>,

    /// Location where generated cache keys are recorded.
    pub key_store: String,

    /// Maximum number of entries held by the in-memory store.
    pub max_capacity: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_lifetime: Some(DEFAULT_LIFETIME),
            key_store: DEFAULT_KEY_STORE.to_string(),
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads `.env` first if present. Every variable is optional:
    /// - `REPOSITORY_CACHE_LIFETIME` - seconds, or `forever` (default 300)
    /// - `REPOSITORY_CACHE_KEY_STORE` - key-store location (default `repository`)
    /// - `CACHE_MAX_CAPACITY` - in-memory store capacity (default 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cache_lifetime = match lookup("REPOSITORY_CACHE_LIFETIME") {
            Some(raw) => parse_lifetime(&raw)?,
            None => defaults.cache_lifetime,
        };

        let key_store = lookup("REPOSITORY_CACHE_KEY_STORE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.key_store);

        let max_capacity = match lookup("CACHE_MAX_CAPACITY") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidCapacity(raw.clone()))?,
            None => defaults.max_capacity,
        };

        Ok(Self {
            cache_lifetime,
            key_store,
            max_capacity,
        })
    }

    /// Cache configuration for repository decorators.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.cache_lifetime,
            key_store: self.key_store.clone(),
        }
    }
}

/// Parse a lifetime: whole seconds, or `forever`/`0` for no expiry.
fn parse_lifetime(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let value = raw.trim().to_lowercase();
    if value == "forever" {
        return Ok(None);
    }

    match value.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(secs) => Ok(Some(Duration::from_secs(secs))),
        Err(_) => Err(ConfigError::InvalidLifetime(raw.to_string())),
    }
}
