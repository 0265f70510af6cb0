//! Cache module - key derivation, handles and stores.
//!
//! ## Architecture
//!
//! - `CacheStore` - Key/value storage with TTL and namespace flush
//! - `MemoryCacheStore` - In-process store using Moka
//! - `KeyRegistry` - Records generated keys per namespace for bulk flush
//! - `CacheKey` - Deterministic key for a `(method, arguments)` read
//! - `CacheHandle` - Namespace, TTL and store bound to one repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! let store = Arc::new(MemoryCacheStore::new());
//! let mut handle = CacheHandle::new(store, &CacheConfig::default());
//! handle.set_cache_object("post.posts");
//!
//! let key = handle.set_cache_key("find", &[5])?;
//! let post = handle.retrieve_from_cache(&key, || fetch_post(5)).await?;
//! ```

mod config;
mod handle;
mod key;
mod memory;
mod registry;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{CacheConfig, DEFAULT_KEY_STORE, DEFAULT_LIFETIME};
pub use handle::CacheHandle;
pub use key::{CacheKey, Namespace};
pub use memory::{DEFAULT_MAX_CAPACITY, MemoryCacheStore};
pub use registry::KeyRegistry;
pub use store::CacheStore;
