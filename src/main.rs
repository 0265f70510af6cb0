//! repocache - Caching decorator demo
//!
//! Wraps an in-memory post repository in a `CachingRepository` and walks
//! through the read, write and flush cycle, logging each step.
//!
//! Run with `RUST_LOG=repocache=debug` to see hits, misses and flushes.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use repocache::repository::{WhereEquals, document};
use repocache::{CachingRepository, Config, InMemoryRepository, MemoryCacheStore, Model, Repository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("repocache=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config);

    let store = Arc::new(MemoryCacheStore::with_capacity(config.max_capacity));
    let repository = InMemoryRepository::new(Model::new("post", "posts"));
    repository
        .create(document(json!({ "id": 5, "name": "A" })))
        .await?;

    let mut posts = CachingRepository::new(repository, store.clone(), &config.cache_config());
    info!("Caching posts in {}", posts.cache_instance().namespace());

    let criteria = Arc::new(WhereEquals::new("id", 5));

    let first = posts.get_by_criteria(criteria.clone()).await?;
    info!("First read: {:?} (queries: {})", first, posts.repository().query_count());

    let second = posts.get_by_criteria(criteria.clone()).await?;
    info!("Second read: {:?} (queries: {})", second, posts.repository().query_count());

    let outcome = posts.update(5, document(json!({ "name": "B" }))).await?;
    info!("Update succeeded: {}", outcome.is_success());

    let third = posts.get_by_criteria(criteria).await?;
    info!("Read after update: {:?} (queries: {})", third, posts.repository().query_count());

    info!("Entries in store: {}", store.entry_count());
    Ok(())
}
