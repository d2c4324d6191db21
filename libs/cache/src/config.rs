use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type")]
pub enum CacheStoreConfig {
  /// A size-bounded store with a per-entry time-to-live.
  #[serde(rename = "in_memory")]
  InMemory {
    #[serde(default)]
    config: InMemoryConfig,
  },
  /// Keeps every entry for the lifetime of the process.
  #[serde(rename = "unbounded")]
  Unbounded,
  /// Never stores anything.
  #[serde(rename = "disabled")]
  Disabled,
}

impl Default for CacheStoreConfig {
  fn default() -> Self {
    CacheStoreConfig::InMemory {
      config: InMemoryConfig::default(),
    }
  }
}

/// Configuration for in-memory caching. Entries are evicted least-recently-used first once the
/// store is full.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, JsonSchema)]
pub struct InMemoryConfig {
  /// The maximum number of cache entries. Default is 1000 entries.
  #[serde(default = "in_memory_default_max_size")]
  pub max_size: usize,

  /// Time-to-live for cache entries in seconds. Default is 600 seconds (10 minutes).
  #[serde(default = "in_memory_default_cache_ttl_seconds")]
  pub cache_ttl_seconds: u64,
}

impl Default for InMemoryConfig {
  fn default() -> Self {
    InMemoryConfig {
      max_size: in_memory_default_max_size(),
      cache_ttl_seconds: in_memory_default_cache_ttl_seconds(),
    }
  }
}

fn in_memory_default_max_size() -> usize {
  1000
}

fn in_memory_default_cache_ttl_seconds() -> u64 {
  600
}
