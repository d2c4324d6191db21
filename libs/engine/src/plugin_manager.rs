use std::sync::Arc;

use switchyard_common::{
  execute::RequestExecutionContext,
  graphql::{GraphQLError, RawParams},
  interceptor::{
    FieldMiddleware, OperationInterceptor, OperationParameterMutator, ResponseInterceptor,
  },
  plugin::{CreatablePlugin, Plugin, PluginError},
};
use switchyard_config::PluginDefinition;
use tracing::debug;

/// Plugins in registration order, plus one chain per capability.
///
/// Chains are built while plugins are registered and never change afterwards, so requests read
/// them without locking.
#[derive(Debug, Default)]
pub struct PluginManager {
  plugins: Vec<Arc<dyn Plugin>>,
  parameter_mutators: Vec<Arc<dyn OperationParameterMutator>>,
  response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
  operation_interceptors: Vec<Arc<dyn OperationInterceptor>>,
  field_middleware: FieldMiddleware,
}

impl PluginManager {
  pub fn new_from_vec(plugins: Vec<Arc<dyn Plugin>>) -> Result<Self, PluginError> {
    let mut pm = Self::default();

    for plugin in plugins {
      pm.register_boxed_plugin(plugin)?;
    }

    Ok(pm)
  }

  pub async fn create_plugin<T: CreatablePlugin + 'static>(
    config: T::Config,
  ) -> Result<Arc<dyn Plugin>, PluginError> {
    let plugin: Arc<dyn Plugin> = T::create(config).await?;

    Ok(plugin)
  }

  pub async fn new(plugins_config: &[PluginDefinition]) -> Result<Self, PluginError> {
    let mut instance = PluginManager::default();

    for plugin_def in plugins_config.iter() {
      if !plugin_def.enabled() {
        debug!("skipping disabled plugin: {:?}", plugin_def);
        continue;
      }

      let plugin = match plugin_def {
        PluginDefinition::AutomaticPersistedQueriesPlugin { config, .. } => {
          Self::create_plugin::<apq_plugin::Plugin>(config.clone().unwrap_or_default()).await?
        }
        PluginDefinition::DisableIntrospectionPlugin { config, .. } => {
          Self::create_plugin::<disable_introspection_plugin::Plugin>(
            config.clone().unwrap_or_default(),
          )
          .await?
        }
        PluginDefinition::ComplexityLimitPlugin { config, .. } => {
          Self::create_plugin::<complexity_limit_plugin::Plugin>(config.clone()).await?
        }
        PluginDefinition::ApolloTracingPlugin { config, .. } => {
          Self::create_plugin::<apollo_tracing_plugin::Plugin>(config.clone().unwrap_or_default())
            .await?
        }
      };

      instance.register_boxed_plugin(plugin)?;
    }

    Ok(instance)
  }

  /// Validates `plugin` and appends it to every chain matching its capabilities.
  pub fn register_boxed_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
    plugin.validate()?;

    if let Some(mutator) = plugin.clone().operation_parameter_mutator() {
      self.parameter_mutators.push(mutator);
    }
    if let Some(interceptor) = plugin.clone().response_interceptor() {
      self.response_interceptors.push(interceptor);
    }
    if let Some(interceptor) = plugin.clone().operation_interceptor() {
      self.operation_interceptors.push(interceptor);
    }
    if let Some(interceptor) = plugin.clone().root_field_interceptor() {
      self.field_middleware.push_root_interceptor(interceptor);
    }
    if let Some(interceptor) = plugin.clone().field_interceptor() {
      self.field_middleware.push_field_interceptor(interceptor);
    }

    debug!(plugin = plugin.name(), "plugin registered");
    self.plugins.push(plugin);

    Ok(())
  }

  pub fn register_plugin(&mut self, plugin: impl Plugin + 'static) -> Result<(), PluginError> {
    self.register_boxed_plugin(Arc::new(plugin))
  }

  pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
    &self.plugins
  }

  pub fn response_interceptors(&self) -> &[Arc<dyn ResponseInterceptor>] {
    &self.response_interceptors
  }

  pub fn operation_interceptors(&self) -> &[Arc<dyn OperationInterceptor>] {
    &self.operation_interceptors
  }

  pub fn field_middleware(&self) -> &FieldMiddleware {
    &self.field_middleware
  }

  /// Runs every parameter mutator in registration order, stopping at the first failure.
  #[tracing::instrument(level = "debug", skip(self, ctx, params))]
  pub async fn on_operation_params(
    &self,
    ctx: &RequestExecutionContext,
    params: &mut RawParams,
  ) -> Result<(), GraphQLError> {
    for mutator in self.parameter_mutators.iter() {
      if ctx.is_cancelled() {
        return Err(GraphQLError::cancelled());
      }

      mutator.mutate_operation_parameters(ctx, params).await?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  #[derive(Debug)]
  struct Rewrite {
    from: &'static str,
    to: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
  }

  #[async_trait::async_trait]
  impl OperationParameterMutator for Rewrite {
    async fn mutate_operation_parameters(
      &self,
      _ctx: &RequestExecutionContext,
      params: &mut RawParams,
    ) -> Result<(), GraphQLError> {
      self.log.lock().unwrap().push(self.from);

      if params.query.as_deref() != Some(self.from) {
        return Err(GraphQLError::new(&format!("expected {}", self.from)));
      }

      params.query = Some(self.to.to_string());
      Ok(())
    }
  }

  impl Plugin for Rewrite {
    fn name(&self) -> &'static str {
      "rewrite"
    }

    fn operation_parameter_mutator(self: Arc<Self>) -> Option<Arc<dyn OperationParameterMutator>> {
      Some(self)
    }
  }

  #[derive(Debug)]
  struct Invalid;

  impl Plugin for Invalid {
    fn name(&self) -> &'static str {
      "invalid"
    }

    fn validate(&self) -> Result<(), PluginError> {
      Err(PluginError::Validation {
        name: self.name().to_string(),
        reason: "always invalid".to_string(),
      })
    }
  }

  fn rewrite(from: &'static str, to: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Rewrite {
    Rewrite {
      from,
      to,
      log: log.clone(),
    }
  }

  #[tokio::test]
  async fn mutators_run_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut pm = PluginManager::default();
    pm.register_plugin(rewrite("a", "b", &log)).unwrap();
    pm.register_plugin(rewrite("b", "c", &log)).unwrap();

    let ctx = RequestExecutionContext::new();
    let mut params = RawParams::new("a");
    pm.on_operation_params(&ctx, &mut params).await.unwrap();

    assert_eq!(params.query.as_deref(), Some("c"));
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    assert_eq!(pm.plugins().len(), 2);
    assert!(pm.response_interceptors().is_empty());
  }

  #[tokio::test]
  async fn first_failing_mutator_stops_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut pm = PluginManager::default();
    pm.register_plugin(rewrite("x", "y", &log)).unwrap();
    pm.register_plugin(rewrite("y", "z", &log)).unwrap();

    let ctx = RequestExecutionContext::new();
    let mut params = RawParams::new("a");
    let error = pm.on_operation_params(&ctx, &mut params).await.unwrap_err();

    assert_eq!(error.message, "expected x");
    assert_eq!(*log.lock().unwrap(), vec!["x"]);
  }

  #[tokio::test]
  async fn cancelled_requests_skip_mutators() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut pm = PluginManager::default();
    pm.register_plugin(rewrite("a", "b", &log)).unwrap();

    let ctx = RequestExecutionContext::new();
    ctx.cancellation_token().cancel();
    let mut params = RawParams::new("a");

    assert_eq!(
      pm.on_operation_params(&ctx, &mut params).await,
      Err(GraphQLError::cancelled())
    );
    assert!(log.lock().unwrap().is_empty());
  }

  #[test]
  fn validation_runs_at_registration() {
    let mut pm = PluginManager::default();

    assert!(matches!(
      pm.register_plugin(Invalid),
      Err(PluginError::Validation { .. })
    ));
    assert!(pm.plugins().is_empty());
  }

  #[tokio::test]
  async fn builds_chains_from_config() {
    let definitions: Vec<PluginDefinition> = serde_json::from_value(serde_json::json!([
      { "type": "automatic_persisted_queries" },
      { "type": "disable_introspection", "enabled": false },
      { "type": "complexity_limit", "config": { "max_complexity": 5 } },
      { "type": "apollo_tracing" }
    ]))
    .unwrap();

    let pm = PluginManager::new(&definitions).await.unwrap();
    let names: Vec<_> = pm.plugins().iter().map(|plugin| plugin.name()).collect();

    assert_eq!(
      names,
      vec!["automatic_persisted_queries", "complexity_limit", "apollo_tracing"]
    );
    assert_eq!(pm.operation_interceptors().len(), 1);
    assert_eq!(pm.response_interceptors().len(), 1);
    assert_eq!(pm.field_middleware().field_interceptors().len(), 1);
  }

  #[tokio::test]
  async fn invalid_config_fails_setup() {
    let definitions: Vec<PluginDefinition> = serde_json::from_value(serde_json::json!([
      { "type": "complexity_limit", "config": { "max_complexity": 0 } }
    ]))
    .unwrap();

    assert!(matches!(
      PluginManager::new(&definitions).await,
      Err(PluginError::Validation { .. })
    ));
  }
}
