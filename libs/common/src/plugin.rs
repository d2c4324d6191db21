use std::{fmt::Debug, sync::Arc};

use crate::interceptor::{
  FieldInterceptor, OperationInterceptor, OperationParameterMutator, ResponseInterceptor,
  RootFieldInterceptor,
};

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
  #[error("Plugin init error: {source}")]
  InitError { source: anyhow::Error },
  #[error("Plugin \"{name}\" failed validation: {reason}")]
  Validation { name: String, reason: String },
}

#[async_trait::async_trait]
pub trait CreatablePlugin: Plugin + Sized {
  type Config: Send + 'static;

  async fn create(config: Self::Config) -> Result<Arc<Self>, PluginError>;
}

/// A unit of cross-cutting behavior.
///
/// Each capability accessor returns `Some(self)` for the hooks the plugin implements. The plugin
/// manager asks once, at registration time, and only adds the plugin to the matching chains.
pub trait Plugin: Send + Sync + Debug {
  fn name(&self) -> &'static str;

  /// Called once when the plugin is registered.
  fn validate(&self) -> Result<(), PluginError> {
    Ok(())
  }

  fn operation_parameter_mutator(self: Arc<Self>) -> Option<Arc<dyn OperationParameterMutator>> {
    None
  }

  fn response_interceptor(self: Arc<Self>) -> Option<Arc<dyn ResponseInterceptor>> {
    None
  }

  fn operation_interceptor(self: Arc<Self>) -> Option<Arc<dyn OperationInterceptor>> {
    None
  }

  fn root_field_interceptor(self: Arc<Self>) -> Option<Arc<dyn RootFieldInterceptor>> {
    None
  }

  fn field_interceptor(self: Arc<Self>) -> Option<Arc<dyn FieldInterceptor>> {
    None
  }
}
