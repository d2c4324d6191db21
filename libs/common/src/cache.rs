use std::{
  collections::HashMap,
  fmt::{self, Debug},
  sync::{PoisonError, RwLock},
};

/// Transient failure of a cache backend.
///
/// A miss is never reported through this type: stores answer `Ok(None)` for unknown keys.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  #[error("cache store \"{store}\" is unavailable: {source}")]
  Unavailable {
    store: String,
    source: anyhow::Error,
  },
}

/// Minimal key/value contract shared by the persisted query store and the document cache.
///
/// Implementations must be safe to call from many requests at once. `add` is idempotent for the
/// same (key, value) pair, and the first value written for a key stays authoritative.
#[async_trait::async_trait]
pub trait Cache<T>: Send + Sync + Debug
where
  T: Send + Sync,
{
  async fn get(&self, key: &str) -> Result<Option<T>, CacheError>;
  async fn add(&self, key: &str, value: T) -> Result<(), CacheError>;
}

/// Unbounded in-memory cache. Suitable for tests and small, static operation sets.
pub struct MapCache<T> {
  entries: RwLock<HashMap<String, T>>,
}

impl<T> MapCache<T> {
  pub fn new() -> Self {
    MapCache {
      entries: RwLock::new(HashMap::new()),
    }
  }

  pub fn len(&self) -> usize {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<T> Default for MapCache<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> FromIterator<(String, T)> for MapCache<T> {
  fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
    MapCache {
      entries: RwLock::new(iter.into_iter().collect()),
    }
  }
}

impl<T> Debug for MapCache<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MapCache")
      .field("entries", &self.len())
      .finish()
  }
}

#[async_trait::async_trait]
impl<T> Cache<T> for MapCache<T>
where
  T: Clone + Send + Sync + 'static,
{
  async fn get(&self, key: &str) -> Result<Option<T>, CacheError> {
    Ok(
      self
        .entries
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned(),
    )
  }

  async fn add(&self, key: &str, value: T) -> Result<(), CacheError> {
    self
      .entries
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .entry(key.to_string())
      .or_insert(value);

    Ok(())
  }
}

/// A cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait::async_trait]
impl<T> Cache<T> for NoCache
where
  T: Send + Sync + 'static,
{
  async fn get(&self, _key: &str) -> Result<Option<T>, CacheError> {
    Ok(None)
  }

  async fn add(&self, _key: &str, _value: T) -> Result<(), CacheError> {
    Ok(())
  }
}
