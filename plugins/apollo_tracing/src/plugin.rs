use std::{
  sync::{Arc, Mutex, PoisonError},
  time::{Duration, Instant},
};

use serde::Serialize;
use serde_json::{Map, Value};
use switchyard_common::{
  execute::{OperationContext, RequestExecutionContext},
  graphql::{GraphQLError, GraphQLResponse},
  interceptor::{FieldInfo, FieldInterceptor, FieldNext, ResponseInterceptor, ResponseNext},
  plugin::{CreatablePlugin, Plugin, PluginError},
};
use tracing::warn;

use crate::config::ApolloTracingPluginConfig;

pub const APOLLO_TRACING_NAME: &str = "ApolloTracing";

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverTiming {
  pub path: Vec<Value>,
  pub parent_type: String,
  pub field_name: String,
  /// Offset from the start of the request.
  pub start_offset: Duration,
  pub duration: Duration,
}

/// Resolver timings collected while a request executes.
#[derive(Debug, Default)]
pub struct TracingRecorder {
  resolvers: Mutex<Vec<ResolverTiming>>,
}

impl TracingRecorder {
  pub fn record(&self, timing: ResolverTiming) {
    self
      .resolvers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(timing);
  }

  pub fn resolvers(&self) -> Vec<ResolverTiming> {
    self
      .resolvers
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TracingExtension {
  version: u8,
  start_time: String,
  end_time: String,
  duration: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  parsing: Option<PhaseTiming>,
  execution: ExecutionTiming,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PhaseTiming {
  start_offset: u64,
  duration: u64,
}

#[derive(Serialize)]
struct ExecutionTiming {
  resolvers: Vec<ResolverEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolverEntry {
  path: Vec<Value>,
  parent_type: String,
  field_name: String,
  start_offset: u64,
  duration: u64,
}

fn nanos(duration: Duration) -> u64 {
  u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[derive(Debug, Default)]
pub struct ApolloTracingPlugin {}

#[async_trait::async_trait]
impl CreatablePlugin for ApolloTracingPlugin {
  type Config = ApolloTracingPluginConfig;

  async fn create(_config: Self::Config) -> Result<Arc<Self>, PluginError> {
    Ok(Arc::new(Self {}))
  }
}

impl ApolloTracingPlugin {
  fn recorder(ctx: &RequestExecutionContext) -> Arc<TracingRecorder> {
    ctx
      .stats()
      .get_or_insert_extension(APOLLO_TRACING_NAME, TracingRecorder::default)
  }

  fn build_extension(ctx: &RequestExecutionContext, end: Instant) -> TracingExtension {
    let stats = ctx.stats();
    let start = stats.operation_start();
    let duration = end.saturating_duration_since(start);
    let start_time = stats.operation_start_time();

    let parsing = stats.parsing().map(|parsing| PhaseTiming {
      start_offset: nanos(parsing.timing.start.saturating_duration_since(start)),
      duration: nanos(parsing.timing.duration()),
    });

    let mut resolvers = Self::recorder(ctx).resolvers();
    resolvers.sort_by_key(|timing| timing.start_offset);

    TracingExtension {
      version: 1,
      start_time: humantime::format_rfc3339_nanos(start_time).to_string(),
      end_time: humantime::format_rfc3339_nanos(start_time + duration).to_string(),
      duration: nanos(duration),
      parsing,
      execution: ExecutionTiming {
        resolvers: resolvers
          .into_iter()
          .map(|timing| ResolverEntry {
            path: timing.path,
            parent_type: timing.parent_type,
            field_name: timing.field_name,
            start_offset: nanos(timing.start_offset),
            duration: nanos(timing.duration),
          })
          .collect(),
      },
    }
  }
}

impl Plugin for ApolloTracingPlugin {
  fn name(&self) -> &'static str {
    "apollo_tracing"
  }

  fn response_interceptor(self: Arc<Self>) -> Option<Arc<dyn ResponseInterceptor>> {
    Some(self)
  }

  fn field_interceptor(self: Arc<Self>) -> Option<Arc<dyn FieldInterceptor>> {
    Some(self)
  }
}

#[async_trait::async_trait]
impl ResponseInterceptor for ApolloTracingPlugin {
  async fn intercept_response<'a>(
    &self,
    ctx: &'a RequestExecutionContext,
    next: ResponseNext<'a>,
  ) -> GraphQLResponse {
    Self::recorder(ctx);

    let mut response = next.run().await;
    let extension = Self::build_extension(ctx, Instant::now());

    match serde_json::to_value(extension) {
      Ok(tracing) => {
        let mut extensions = Map::new();
        extensions.insert("tracing".to_string(), tracing);
        response.append_extensions(extensions);
      }
      Err(e) => warn!("failed to serialize tracing extension: {}", e),
    }

    response
  }
}

#[async_trait::async_trait]
impl FieldInterceptor for ApolloTracingPlugin {
  async fn intercept_field<'a>(
    &self,
    ctx: &'a OperationContext,
    field: &'a FieldInfo,
    next: FieldNext<'a>,
  ) -> Result<Value, GraphQLError> {
    let start = Instant::now();
    let result = next.run().await;
    let duration = start.elapsed();

    Self::recorder(ctx.request()).record(ResolverTiming {
      path: field.path.clone(),
      parent_type: field.parent_type.clone(),
      field_name: field.field_name.clone(),
      start_offset: start.saturating_duration_since(ctx.stats().operation_start()),
      duration,
    });

    result
  }
}
