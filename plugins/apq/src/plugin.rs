use std::sync::Arc;

use serde::{de, Deserialize, Deserializer};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use switchyard_cache::CacheStoreConfig;
use switchyard_common::{
  cache::{Cache, CacheError},
  execute::RequestExecutionContext,
  graphql::{GraphQLError, RawParams},
  interceptor::OperationParameterMutator,
  plugin::{CreatablePlugin, Plugin, PluginError},
};
use tracing::{debug, warn};

use crate::config::ApqPluginConfig;

pub const APQ_STATS_NAME: &str = "APQ";
const PERSISTED_QUERY_EXTENSION: &str = "persistedQuery";
const SUPPORTED_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApqStats {
  /// The client sent the operation text along with its hash.
  pub sent_query: bool,
  pub hash: String,
}

/// Returns the persisted query stats recorded for this request, if the plugin ran.
pub fn get_apq_stats(ctx: &RequestExecutionContext) -> Option<Arc<ApqStats>> {
  ctx.stats().get_extension::<ApqStats>(APQ_STATS_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ApqError {
  #[error("invalid APQ extension data")]
  InvalidExtensionData,
  #[error("unsupported APQ version")]
  UnsupportedVersion,
  #[error("PersistedQueryNotFound")]
  NotFound,
  #[error("provided APQ hash does not match query")]
  HashMismatch,
  #[error("persisted query cache unavailable")]
  CacheUnavailable(#[source] CacheError),
  #[error("request cancelled")]
  Cancelled,
}

impl From<ApqError> for GraphQLError {
  fn from(error: ApqError) -> Self {
    let message = error.to_string();

    match error {
      ApqError::NotFound => GraphQLError::new(&message).with_code("PERSISTED_QUERY_NOT_FOUND"),
      ApqError::CacheUnavailable(_) => {
        GraphQLError::new(&message).with_code("PERSISTED_QUERY_CACHE_UNAVAILABLE")
      }
      ApqError::Cancelled => GraphQLError::cancelled(),
      _ => GraphQLError::new(&message),
    }
  }
}

#[derive(Deserialize, Debug)]
struct PersistedQueryExtension {
  #[serde(default, deserialize_with = "deserialize_version")]
  version: i64,
  #[serde(rename = "sha256Hash", default)]
  sha256_hash: String,
}

/// Accepts integers and whole-number floats such as `1.0`.
fn deserialize_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
  let number = Number::deserialize(deserializer)?;

  number
    .as_i64()
    .or_else(|| {
      number
        .as_f64()
        .filter(|version| version.fract() == 0.0 && version.abs() <= i64::MAX as f64)
        .map(|version| version as i64)
    })
    .ok_or_else(|| de::Error::custom(format!("invalid APQ version {}", number)))
}

#[derive(Debug)]
pub struct AutomaticPersistedQueriesPlugin {
  cache: Option<Arc<dyn Cache<String>>>,
}

#[async_trait::async_trait]
impl CreatablePlugin for AutomaticPersistedQueriesPlugin {
  type Config = ApqPluginConfig;

  async fn create(config: ApqPluginConfig) -> Result<Arc<Self>, PluginError> {
    if config.store == CacheStoreConfig::Disabled {
      return Err(PluginError::Validation {
        name: "automatic_persisted_queries".to_string(),
        reason: "the persisted query store cannot be disabled".to_string(),
      });
    }

    let cache = switchyard_cache::create_store::<String>(&config.store);

    Ok(Arc::new(Self::new(Some(cache))))
  }
}

impl AutomaticPersistedQueriesPlugin {
  pub fn new(cache: Option<Arc<dyn Cache<String>>>) -> Self {
    Self { cache }
  }

  pub fn with_cache(cache: Arc<dyn Cache<String>>) -> Self {
    Self::new(Some(cache))
  }

  #[tracing::instrument(level = "debug", skip_all, name = "AutomaticPersistedQueriesPlugin::resolve")]
  async fn resolve(
    &self,
    ctx: &RequestExecutionContext,
    params: &mut RawParams,
  ) -> Result<(), ApqError> {
    let extension = match params.extensions.get(PERSISTED_QUERY_EXTENSION) {
      Some(Value::Null) | None => return Ok(()),
      Some(extension) => PersistedQueryExtension::deserialize(extension).map_err(|e| {
        debug!("failed to decode persisted query extension: {}", e);
        ApqError::InvalidExtensionData
      })?,
    };

    if extension.version != SUPPORTED_VERSION {
      return Err(ApqError::UnsupportedVersion);
    }

    // only reachable when validate() was skipped
    let cache = self.cache.as_ref().ok_or_else(|| {
      ApqError::CacheUnavailable(CacheError::Unavailable {
        store: "none".to_string(),
        source: anyhow::anyhow!("no persisted query cache configured"),
      })
    })?;

    let hash = extension.sha256_hash;

    if !params.has_query() {
      let query = ctx
        .cancellable(cache.get(&hash))
        .await
        .map_err(|_| ApqError::Cancelled)?
        .map_err(|e| {
          warn!("failed to look up persisted query: {}", e);
          ApqError::CacheUnavailable(e)
        })?
        .ok_or(ApqError::NotFound)?;

      debug!(hash = %hash, "resolved persisted query from cache");
      params.query = Some(query);
      ctx.stats().set_extension(
        APQ_STATS_NAME,
        ApqStats {
          sent_query: false,
          hash,
        },
      );

      return Ok(());
    }

    let query = params.query.clone().unwrap_or_default();
    if !compute_query_hash(&query).eq_ignore_ascii_case(&hash) {
      return Err(ApqError::HashMismatch);
    }

    ctx
      .cancellable(cache.add(&hash, query))
      .await
      .map_err(|_| ApqError::Cancelled)?
      .map_err(|e| {
        warn!("failed to register persisted query: {}", e);
        ApqError::CacheUnavailable(e)
      })?;

    debug!(hash = %hash, "registered persisted query");
    ctx.stats().set_extension(
      APQ_STATS_NAME,
      ApqStats {
        sent_query: true,
        hash,
      },
    );

    Ok(())
  }
}

pub(crate) fn compute_query_hash(query: &str) -> String {
  hex::encode(Sha256::digest(query.as_bytes()))
}

impl Plugin for AutomaticPersistedQueriesPlugin {
  fn name(&self) -> &'static str {
    "automatic_persisted_queries"
  }

  fn validate(&self) -> Result<(), PluginError> {
    match self.cache {
      Some(_) => Ok(()),
      None => Err(PluginError::Validation {
        name: self.name().to_string(),
        reason: "a persisted query cache is required".to_string(),
      }),
    }
  }

  fn operation_parameter_mutator(self: Arc<Self>) -> Option<Arc<dyn OperationParameterMutator>> {
    Some(self)
  }
}

#[async_trait::async_trait]
impl OperationParameterMutator for AutomaticPersistedQueriesPlugin {
  async fn mutate_operation_parameters(
    &self,
    ctx: &RequestExecutionContext,
    params: &mut RawParams,
  ) -> Result<(), GraphQLError> {
    self.resolve(ctx, params).await.map_err(GraphQLError::from)
  }
}
