pub mod config;
pub mod stores;

use std::sync::Arc;

use switchyard_common::cache::{Cache, MapCache, NoCache};

pub use config::{CacheStoreConfig, InMemoryConfig};
pub use stores::in_memory::InMemoryCacheStore;

/// Builds the store described by `config`.
pub fn create_store<T>(config: &CacheStoreConfig) -> Arc<dyn Cache<T>>
where
  T: Clone + Send + Sync + 'static,
{
  match config {
    CacheStoreConfig::InMemory { config } => {
      tracing::debug!(
        max_size = config.max_size,
        cache_ttl_seconds = config.cache_ttl_seconds,
        "creating in-memory cache store"
      );

      Arc::new(InMemoryCacheStore::new(config))
    }
    CacheStoreConfig::Unbounded => Arc::new(MapCache::new()),
    CacheStoreConfig::Disabled => Arc::new(NoCache),
  }
}
