use std::sync::Arc;

use serde_json::{json, Value};
use switchyard_common::{
  cache::{Cache, CacheError, MapCache},
  execute::RequestExecutionContext,
  graphql::RawParams,
  interceptor::OperationParameterMutator,
  plugin::{CreatablePlugin, Plugin, PluginError},
};

use switchyard_cache::CacheStoreConfig;

use crate::{
  config::ApqPluginConfig,
  get_apq_stats,
  plugin::{compute_query_hash, AutomaticPersistedQueriesPlugin},
  ApqStats,
};

const QUERY: &str = "{ me { name } }";
const HASH: &str = "b8d9506e34c83b0e53c2aa463624fcea354713bc38f95276e6f0bd893ffb5b88";

fn params(query: Option<&str>, persisted_query: Value) -> RawParams {
  let mut params = RawParams {
    query: query.map(str::to_string),
    ..Default::default()
  };
  params
    .extensions
    .insert("persistedQuery".to_string(), persisted_query);

  params
}

fn plugin_with(cache: &Arc<MapCache<String>>) -> AutomaticPersistedQueriesPlugin {
  AutomaticPersistedQueriesPlugin::with_cache(cache.clone())
}

#[derive(Debug)]
struct UnavailableCache;

#[async_trait::async_trait]
impl Cache<String> for UnavailableCache {
  async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
    Err(CacheError::Unavailable {
      store: "test".to_string(),
      source: anyhow::anyhow!("connection refused"),
    })
  }

  async fn add(&self, _key: &str, _value: String) -> Result<(), CacheError> {
    Err(CacheError::Unavailable {
      store: "test".to_string(),
      source: anyhow::anyhow!("connection refused"),
    })
  }
}

#[test]
fn hashes_query_text() {
  assert_eq!(compute_query_hash(QUERY), HASH);
  assert_eq!(
    compute_query_hash("{ name }"),
    "30166fc3298853f22709fce1e4a00e98f1b6a3160eaaaf9cb3b7db6a16073b07"
  );
}

#[tokio::test]
async fn query_without_extension_is_untouched() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = RawParams::new("original query");

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(params.query.as_deref(), Some("original query"));
  assert!(cache.is_empty());
  assert_eq!(get_apq_stats(&ctx), None);
}

#[tokio::test]
async fn null_extension_counts_as_absent() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = params(Some("{ name }"), Value::Null);

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(params.query.as_deref(), Some("{ name }"));
  assert!(cache.is_empty());
  assert_eq!(get_apq_stats(&ctx), None);
}

#[tokio::test]
async fn whole_number_float_version_is_accepted() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1.0 }));

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(cache.get(HASH).await.unwrap().as_deref(), Some(QUERY));
}

#[tokio::test]
async fn hash_miss_without_query() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = params(None, json!({ "sha256Hash": HASH, "version": 1 }));

  let error = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await
    .unwrap_err();

  assert_eq!(error.message, "PersistedQueryNotFound");
  assert_eq!(error.code(), Some("PERSISTED_QUERY_NOT_FOUND"));
  assert_eq!(params.query, None);
}

#[tokio::test]
async fn hash_miss_with_query_registers() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1 }));

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(params.query.as_deref(), Some(QUERY));
  assert_eq!(cache.get(HASH).await.unwrap().as_deref(), Some(QUERY));
  assert_eq!(
    get_apq_stats(&ctx).as_deref(),
    Some(&ApqStats {
      sent_query: true,
      hash: HASH.to_string(),
    })
  );
}

#[tokio::test]
async fn hash_hit_without_query() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::from_iter([(HASH.to_string(), QUERY.to_string())]));
  let mut params = params(None, json!({ "sha256Hash": HASH, "version": 1 }));

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(params.query.as_deref(), Some(QUERY));
  assert_eq!(
    get_apq_stats(&ctx).as_deref(),
    Some(&ApqStats {
      sent_query: false,
      hash: HASH.to_string(),
    })
  );
}

#[tokio::test]
async fn empty_query_is_treated_as_hash_only() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::from_iter([(HASH.to_string(), QUERY.to_string())]));
  let mut params = params(Some(""), json!({ "sha256Hash": HASH, "version": 1 }));

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(params.query.as_deref(), Some(QUERY));
}

#[tokio::test]
async fn malformed_extension_payload() {
  let cache = Arc::new(MapCache::new());

  for payload in [
    json!("asdf"),
    json!(42),
    json!({ "version": "1", "sha256Hash": HASH }),
    json!({ "version": 1, "sha256Hash": 5 }),
    json!({ "version": 1.5, "sha256Hash": HASH }),
  ] {
    let ctx = RequestExecutionContext::new();
    let mut params = params(Some(QUERY), payload);

    let error = plugin_with(&cache)
      .mutate_operation_parameters(&ctx, &mut params)
      .await
      .unwrap_err();

    assert_eq!(error.message, "invalid APQ extension data");
  }

  assert!(cache.is_empty());
}

#[tokio::test]
async fn unsupported_versions() {
  let cache = Arc::new(MapCache::new());

  for payload in [
    json!({ "version": 2 }),
    json!({ "version": 0, "sha256Hash": HASH }),
    json!({ "sha256Hash": HASH }),
  ] {
    let ctx = RequestExecutionContext::new();
    let mut params = params(Some(QUERY), payload);

    let error = plugin_with(&cache)
      .mutate_operation_parameters(&ctx, &mut params)
      .await
      .unwrap_err();

    assert_eq!(error.message, "unsupported APQ version");
  }

  assert!(cache.is_empty());
}

#[tokio::test]
async fn hash_mismatch_never_writes() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let mut params = params(Some(QUERY), json!({ "sha256Hash": "badhash", "version": 1 }));

  let error = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await
    .unwrap_err();

  assert_eq!(error.message, "provided APQ hash does not match query");
  assert!(cache.is_empty());
  assert_eq!(get_apq_stats(&ctx), None);
}

#[tokio::test]
async fn hash_comparison_ignores_case() {
  let ctx = RequestExecutionContext::new();
  let cache = Arc::new(MapCache::new());
  let upper = HASH.to_uppercase();
  let mut params = params(Some(QUERY), json!({ "sha256Hash": upper, "version": 1 }));

  let result = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await;

  assert_eq!(result, Ok(()));
  assert_eq!(cache.get(&upper).await.unwrap().as_deref(), Some(QUERY));
}

#[tokio::test]
async fn registration_is_idempotent() {
  let cache = Arc::new(MapCache::new());
  let plugin = plugin_with(&cache);

  for _ in 0..3 {
    let ctx = RequestExecutionContext::new();
    let mut params = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1 }));
    assert_eq!(
      plugin.mutate_operation_parameters(&ctx, &mut params).await,
      Ok(())
    );
  }

  assert_eq!(cache.len(), 1);

  let ctx = RequestExecutionContext::new();
  let mut params = params(None, json!({ "sha256Hash": HASH, "version": 1 }));
  assert_eq!(
    plugin.mutate_operation_parameters(&ctx, &mut params).await,
    Ok(())
  );
  assert_eq!(params.query.as_deref(), Some(QUERY));
}

#[tokio::test]
async fn concurrent_registrations() {
  let cache = Arc::new(MapCache::new());
  let plugin = Arc::new(plugin_with(&cache));

  let tasks: Vec<_> = (0..32)
    .map(|_| {
      let plugin = plugin.clone();
      tokio::spawn(async move {
        let ctx = RequestExecutionContext::new();
        let mut params = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1 }));
        plugin.mutate_operation_parameters(&ctx, &mut params).await
      })
    })
    .collect();

  for task in tasks {
    assert_eq!(task.await.unwrap(), Ok(()));
  }

  let ctx = RequestExecutionContext::new();
  let mut params = params(None, json!({ "sha256Hash": HASH, "version": 1 }));
  assert_eq!(
    plugin.mutate_operation_parameters(&ctx, &mut params).await,
    Ok(())
  );
  assert_eq!(params.query.as_deref(), Some(QUERY));
}

#[tokio::test]
async fn unavailable_cache_is_not_a_miss() {
  let plugin = AutomaticPersistedQueriesPlugin::with_cache(Arc::new(UnavailableCache));

  let ctx = RequestExecutionContext::new();
  let mut lookup = params(None, json!({ "sha256Hash": HASH, "version": 1 }));
  let error = plugin
    .mutate_operation_parameters(&ctx, &mut lookup)
    .await
    .unwrap_err();
  assert_eq!(error.message, "persisted query cache unavailable");
  assert_eq!(error.code(), Some("PERSISTED_QUERY_CACHE_UNAVAILABLE"));

  let mut register = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1 }));
  let error = plugin
    .mutate_operation_parameters(&ctx, &mut register)
    .await
    .unwrap_err();
  assert_eq!(error.message, "persisted query cache unavailable");
  assert_eq!(get_apq_stats(&ctx), None);
}

#[tokio::test]
async fn cancelled_request_is_not_resolved() {
  let ctx = RequestExecutionContext::new();
  ctx.cancellation_token().cancel();
  let cache = Arc::new(MapCache::from_iter([(HASH.to_string(), QUERY.to_string())]));
  let mut params = params(None, json!({ "sha256Hash": HASH, "version": 1 }));

  let error = plugin_with(&cache)
    .mutate_operation_parameters(&ctx, &mut params)
    .await
    .unwrap_err();

  assert_eq!(error.code(), Some("REQUEST_CANCELLED"));
  assert_eq!(params.query, None);
}

#[test]
fn validation_requires_a_cache() {
  let plugin = AutomaticPersistedQueriesPlugin::new(None);

  assert!(matches!(
    plugin.validate(),
    Err(PluginError::Validation { .. })
  ));
  assert!(AutomaticPersistedQueriesPlugin::with_cache(Arc::new(MapCache::new()))
    .validate()
    .is_ok());
}

#[tokio::test]
async fn created_from_config() {
  let plugin = AutomaticPersistedQueriesPlugin::create(ApqPluginConfig::default())
    .await
    .unwrap();

  assert!(plugin.validate().is_ok());
  assert!(plugin.clone().operation_parameter_mutator().is_some());
  assert!(plugin.operation_interceptor().is_none());
}

#[tokio::test]
async fn disabled_store_fails_setup() {
  let config: ApqPluginConfig =
    serde_json::from_value(json!({ "store": { "type": "disabled" } })).unwrap();
  assert_eq!(config.store, CacheStoreConfig::Disabled);

  assert!(matches!(
    AutomaticPersistedQueriesPlugin::create(config).await,
    Err(PluginError::Validation { .. })
  ));
}

#[tokio::test]
async fn unbounded_store_round_trips() {
  let config: ApqPluginConfig =
    serde_json::from_value(json!({ "store": { "type": "unbounded" } })).unwrap();
  let plugin = AutomaticPersistedQueriesPlugin::create(config).await.unwrap();

  let mut register = params(Some(QUERY), json!({ "sha256Hash": HASH, "version": 1 }));
  plugin
    .mutate_operation_parameters(&RequestExecutionContext::new(), &mut register)
    .await
    .unwrap();

  let mut follow_up = params(None, json!({ "sha256Hash": HASH, "version": 1 }));
  plugin
    .mutate_operation_parameters(&RequestExecutionContext::new(), &mut follow_up)
    .await
    .unwrap();

  assert_eq!(follow_up.query.as_deref(), Some(QUERY));
}
