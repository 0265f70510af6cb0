//! repocache - transparent caching for repositories.
//!
//! ## Architecture
//!
//! - `repository` - Repository contract, criteria and an in-memory repository
//! - `cache` - Cache keys, handles and stores (Moka-backed in-memory store)
//! - `decorator` - `CachingRepository`, the caching decorator
//! - `config` - Environment configuration
//! - `error` - Error types

pub mod cache;
pub mod config;
pub mod decorator;
pub mod error;
pub mod repository;

pub use cache::{CacheConfig, CacheHandle, CacheKey, CacheStore, MemoryCacheStore, Namespace};
pub use config::Config;
pub use decorator::{CachingRepository, FlushPolicy};
pub use error::{CacheError, ConfigError, RepositoryError};
pub use repository::{Criteria, Document, InMemoryRepository, Model, Repository, WriteOutcome};
