use std::{
  fmt::{self, Debug},
  sync::{Mutex, PoisonError},
};

use cached::{Cached, TimedSizedCache};
use switchyard_common::cache::{Cache, CacheError};

use crate::config::InMemoryConfig;

pub struct InMemoryCacheStore<T> {
  config: InMemoryConfig,
  cache: Mutex<TimedSizedCache<String, T>>,
}

impl<T> InMemoryCacheStore<T>
where
  T: Clone,
{
  pub fn new(config: &InMemoryConfig) -> Self {
    // zero-sized caches are rejected by `cached`
    let cache =
      TimedSizedCache::with_size_and_lifespan(config.max_size.max(1), config.cache_ttl_seconds);

    InMemoryCacheStore {
      config: *config,
      cache: Mutex::new(cache),
    }
  }
}

impl<T> Debug for InMemoryCacheStore<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InMemoryCacheStore")
      .field("config", &self.config)
      .finish()
  }
}

#[async_trait::async_trait]
impl<T> Cache<T> for InMemoryCacheStore<T>
where
  T: Clone + Send + Sync + 'static,
{
  async fn get(&self, key: &str) -> Result<Option<T>, CacheError> {
    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

    Ok(cache.cache_get(key).cloned())
  }

  async fn add(&self, key: &str, value: T) -> Result<(), CacheError> {
    let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

    if cache.cache_get(key).is_none() {
      cache.cache_set(key.to_string(), value);
    }

    Ok(())
  }
}
