use std::sync::Arc;

use switchyard_common::{
  execute::{OperationContext, RequestExecutionContext},
  graphql::{GraphQLError, GraphQLResponse},
  interceptor::{OperationInterceptor, OperationNext},
  plugin::{CreatablePlugin, Plugin, PluginError},
};
use tracing::debug;

use crate::{complexity::operation_complexity, config::ComplexityLimitPluginConfig};

pub const COMPLEXITY_STATS_NAME: &str = "ComplexityLimit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexityStats {
  pub complexity: usize,
  pub complexity_limit: usize,
}

pub fn get_complexity_stats(ctx: &RequestExecutionContext) -> Option<Arc<ComplexityStats>> {
  ctx
    .stats()
    .get_extension::<ComplexityStats>(COMPLEXITY_STATS_NAME)
}

#[derive(Debug)]
pub struct ComplexityLimitPlugin {
  max_complexity: usize,
}

impl ComplexityLimitPlugin {
  pub fn new(max_complexity: usize) -> Self {
    Self { max_complexity }
  }
}

#[async_trait::async_trait]
impl CreatablePlugin for ComplexityLimitPlugin {
  type Config = ComplexityLimitPluginConfig;

  async fn create(config: Self::Config) -> Result<Arc<Self>, PluginError> {
    Ok(Arc::new(Self::new(config.max_complexity)))
  }
}

impl Plugin for ComplexityLimitPlugin {
  fn name(&self) -> &'static str {
    "complexity_limit"
  }

  fn validate(&self) -> Result<(), PluginError> {
    if self.max_complexity == 0 {
      return Err(PluginError::Validation {
        name: self.name().to_string(),
        reason: "max_complexity must be greater than zero".to_string(),
      });
    }

    Ok(())
  }

  fn operation_interceptor(self: Arc<Self>) -> Option<Arc<dyn OperationInterceptor>> {
    Some(self)
  }
}

#[async_trait::async_trait]
impl OperationInterceptor for ComplexityLimitPlugin {
  async fn intercept_operation<'a>(
    &self,
    ctx: &'a OperationContext,
    next: OperationNext<'a>,
  ) -> GraphQLResponse {
    let complexity = operation_complexity(ctx.document(), ctx.operation());
    ctx.stats().set_extension(
      COMPLEXITY_STATS_NAME,
      ComplexityStats {
        complexity,
        complexity_limit: self.max_complexity,
      },
    );

    if complexity > self.max_complexity {
      debug!(
        complexity,
        max_complexity = self.max_complexity,
        "operation rejected"
      );

      return GraphQLError::new(&format!(
        "operation has complexity {}, which exceeds the limit of {}",
        complexity, self.max_complexity
      ))
      .with_code("COMPLEXITY_LIMIT_EXCEEDED")
      .into();
    }

    next.run().await
  }
}
