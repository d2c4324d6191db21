use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use switchyard_cache::CacheStoreConfig;

/// The `automatic_persisted_queries` plugin implements the Automatic Persisted Queries protocol.
///
/// Clients send the SHA-256 hash of an operation instead of its text. When the hash is unknown,
/// the request fails with `PersistedQueryNotFound` and the client retries with the full text and
/// the hash, which registers the operation for later hash-only requests.
///
/// The hash travels in the request extensions:
///
/// ```json
/// { "extensions": { "persistedQuery": { "version": 1, "sha256Hash": "<hex digest>" } } }
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, JsonSchema)]
pub struct ApqPluginConfig {
  /// Where registered operations are kept. Defaults to a bounded in-memory store.
  #[serde(default)]
  pub store: CacheStoreConfig,
}
