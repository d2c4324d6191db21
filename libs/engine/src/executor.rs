use std::{sync::Arc, time::Instant};

use switchyard_cache::{create_store, CacheStoreConfig};
use switchyard_common::{
  cache::Cache,
  execute::{
    ExecutableSchema, OperationContext, OperationSelectionError, ParsingStats,
    RequestExecutionContext, TraceTiming,
  },
  graphql::{
    parse_graphql_operation, GraphQLError, GraphQLResponse, ParseError, ParsedGraphQLDocument,
    RawParams,
  },
  interceptor::{OperationNext, ResponseFuture, ResponseNext},
  plugin::PluginError,
};
use switchyard_config::SwitchyardConfig;
use tracing::{debug, warn};

use crate::{plugin_manager::PluginManager, static_schema::StaticDataSchema};

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
  #[error("no operation provided")]
  NoOperationProvided,
  #[error("{0}")]
  ParseError(#[from] ParseError),
  #[error(transparent)]
  OperationNotFound(#[from] OperationSelectionError),
  #[error("request cancelled")]
  Cancelled,
}

impl From<ExecutionError> for GraphQLError {
  fn from(error: ExecutionError) -> Self {
    match error {
      ExecutionError::NoOperationProvided => GraphQLError::new(&error.to_string()),
      ExecutionError::ParseError(_) => {
        GraphQLError::new(&error.to_string()).with_code("GRAPHQL_PARSE_FAILED")
      }
      ExecutionError::OperationNotFound(e) => e.into(),
      ExecutionError::Cancelled => GraphQLError::cancelled(),
    }
  }
}

/// Runs requests through the plugin chains and the schema.
///
/// Shared by every request; all per-request state lives in [`RequestExecutionContext`].
#[derive(Debug)]
pub struct Executor {
  schema: Arc<dyn ExecutableSchema>,
  plugin_manager: Arc<PluginManager>,
  document_cache: Arc<dyn Cache<Arc<ParsedGraphQLDocument>>>,
}

impl Executor {
  pub fn new(schema: Arc<dyn ExecutableSchema>, plugin_manager: PluginManager) -> Self {
    Self {
      schema,
      plugin_manager: Arc::new(plugin_manager),
      document_cache: create_store(&CacheStoreConfig::default()),
    }
  }

  pub fn with_document_cache(
    mut self,
    document_cache: Arc<dyn Cache<Arc<ParsedGraphQLDocument>>>,
  ) -> Self {
    self.document_cache = document_cache;
    self
  }

  pub async fn from_config(config: &SwitchyardConfig) -> Result<Self, PluginError> {
    let plugin_manager = PluginManager::new(&config.plugins).await?;
    let schema = Arc::new(StaticDataSchema::new(config.source.clone()));

    Ok(Self::new(schema, plugin_manager).with_document_cache(create_store(&config.document_cache)))
  }

  pub fn plugin_manager(&self) -> &PluginManager {
    &self.plugin_manager
  }

  pub async fn execute(&self, params: RawParams) -> GraphQLResponse {
    self
      .execute_with_context(Arc::new(RequestExecutionContext::new()), params)
      .await
  }

  #[tracing::instrument(level = "debug", skip(self, ctx, params), name = "Executor::execute")]
  pub async fn execute_with_context(
    &self,
    ctx: Arc<RequestExecutionContext>,
    params: RawParams,
  ) -> GraphQLResponse {
    let handler: ResponseFuture<'_> = Box::pin(self.resolve_and_execute(ctx.clone(), params));

    ResponseNext::new(&ctx, self.plugin_manager.response_interceptors(), handler)
      .run()
      .await
  }

  async fn resolve_and_execute(
    &self,
    ctx: Arc<RequestExecutionContext>,
    mut params: RawParams,
  ) -> GraphQLResponse {
    if let Err(error) = self
      .plugin_manager
      .on_operation_params(&ctx, &mut params)
      .await
    {
      debug!("operation parameters rejected: {}", error.message);
      return error.into();
    }

    match self.execute_operation(ctx.clone(), params).await {
      Ok(mut response) => {
        response.append_errors(ctx.take_errors());
        response
      }
      Err(error) => GraphQLError::from(error).into(),
    }
  }

  async fn execute_operation(
    &self,
    request: Arc<RequestExecutionContext>,
    params: RawParams,
  ) -> Result<GraphQLResponse, ExecutionError> {
    if request.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    let document = match params.query.as_deref() {
      Some(query) if !query.is_empty() => self.parse_document(&request, query).await?,
      _ => return Err(ExecutionError::NoOperationProvided),
    };

    let ctx = OperationContext::new(
      request,
      params,
      document,
      self.plugin_manager.field_middleware().clone(),
    )?;

    if ctx.is_cancelled() {
      return Err(ExecutionError::Cancelled);
    }

    let schema_execution: ResponseFuture<'_> = Box::pin(async {
      match ctx.request().cancellable(self.schema.execute(&ctx)).await {
        Ok(response) => response,
        Err(error) => error.into(),
      }
    });

    Ok(
      OperationNext::new(
        &ctx,
        self.plugin_manager.operation_interceptors(),
        schema_execution,
      )
      .run()
      .await,
    )
  }

  #[tracing::instrument(level = "debug", skip_all, name = "Executor::parse_document")]
  async fn parse_document(
    &self,
    request: &RequestExecutionContext,
    query: &str,
  ) -> Result<Arc<ParsedGraphQLDocument>, ExecutionError> {
    let start = Instant::now();

    match self.document_cache.get(query).await {
      Ok(Some(document)) => {
        request.stats().set_parsing(ParsingStats {
          timing: TraceTiming {
            start,
            end: Instant::now(),
          },
          cache_hit: true,
        });

        return Ok(document);
      }
      Ok(None) => {}
      Err(e) => warn!("document cache lookup failed, parsing instead: {}", e),
    }

    let document = Arc::new(parse_graphql_operation(query)?);
    let end = Instant::now();

    if let Err(e) = self.document_cache.add(query, document.clone()).await {
      warn!("failed to cache parsed document: {}", e);
    }

    request.stats().set_parsing(ParsingStats {
      timing: TraceTiming { start, end },
      cache_hit: false,
    });

    Ok(document)
  }
}

#[cfg(feature = "test_utils")]
impl Executor {
  pub fn new_test(
    schema: Arc<dyn ExecutableSchema>,
    plugins: Vec<Arc<dyn switchyard_common::plugin::Plugin>>,
  ) -> Result<Self, PluginError> {
    Ok(Self::new(schema, PluginManager::new_from_vec(plugins)?))
  }

  pub async fn execute_test(
    schema: Arc<dyn ExecutableSchema>,
    plugins: Vec<Arc<dyn switchyard_common::plugin::Plugin>>,
    params: RawParams,
  ) -> Result<GraphQLResponse, PluginError> {
    Ok(Self::new_test(schema, plugins)?.execute(params).await)
  }
}
