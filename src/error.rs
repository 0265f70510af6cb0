//! Error types.

use thiserror::Error;

/// Errors raised by repositories.
///
/// The caching decorator propagates these unmodified.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The criteria does not support the repository's model.
    #[error("criteria `{criteria}` cannot be applied to model `{model}`")]
    WrongCriteria { criteria: String, model: String },

    /// The backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors raised by cache stores.
///
/// These never reach callers of the decorator: a failing
/// store degrades to direct execution.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cache lifetime `{0}` (expected seconds or `forever`)")]
    InvalidLifetime(String),

    #[error("invalid cache capacity `{0}`")]
    InvalidCapacity(String),
}
