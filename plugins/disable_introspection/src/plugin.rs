use std::sync::Arc;

use crate::config::DisableIntrospectionPluginConfig;
use switchyard_common::{
  execute::OperationContext,
  graphql::{is_introspection_operation, GraphQLError, GraphQLResponse},
  interceptor::{OperationInterceptor, OperationNext},
  plugin::{CreatablePlugin, Plugin, PluginError},
};
use tracing::debug;

#[derive(Debug, Default)]
pub struct DisableIntrospectionPlugin {}

#[async_trait::async_trait]
impl CreatablePlugin for DisableIntrospectionPlugin {
  type Config = DisableIntrospectionPluginConfig;

  async fn create(_config: Self::Config) -> Result<Arc<Self>, PluginError> {
    Ok(Arc::new(Self {}))
  }
}

impl Plugin for DisableIntrospectionPlugin {
  fn name(&self) -> &'static str {
    "disable_introspection"
  }

  fn operation_interceptor(self: Arc<Self>) -> Option<Arc<dyn OperationInterceptor>> {
    Some(self)
  }
}

#[async_trait::async_trait]
impl OperationInterceptor for DisableIntrospectionPlugin {
  async fn intercept_operation<'a>(
    &self,
    ctx: &'a OperationContext,
    next: OperationNext<'a>,
  ) -> GraphQLResponse {
    if is_introspection_operation(ctx.operation()) {
      debug!(
        operation_name = ctx.operation_name(),
        "rejecting introspection operation"
      );

      return GraphQLError::new("introspection is disabled")
        .with_code("INTROSPECTION_DISABLED")
        .into();
    }

    next.run().await
  }
}
