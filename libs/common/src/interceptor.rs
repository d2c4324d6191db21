use std::{fmt::Debug, sync::Arc};

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::{
  execute::{OperationContext, RequestExecutionContext},
  graphql::{GraphQLError, GraphQLResponse, RawParams},
};

pub type ResponseFuture<'a> = BoxFuture<'a, GraphQLResponse>;
pub type ResolverFuture<'a> = BoxFuture<'a, Result<Value, GraphQLError>>;

// Lifecycle, outermost first:
// intercept_response -> mutate_operation_parameters -> intercept_operation -> ExecutableSchema::execute
//   -> intercept_root_field -> intercept_field -> resolver

/// Rewrites the raw parameters before anything is parsed or executed.
///
/// Mutators run one after the other in registration order. The first error aborts the request
/// and becomes its response.
#[async_trait::async_trait]
pub trait OperationParameterMutator: Send + Sync + Debug {
  async fn mutate_operation_parameters(
    &self,
    ctx: &RequestExecutionContext,
    params: &mut RawParams,
  ) -> Result<(), GraphQLError>;
}

/// Wraps the outermost response-production boundary of a request.
#[async_trait::async_trait]
pub trait ResponseInterceptor: Send + Sync + Debug {
  async fn intercept_response<'a>(
    &self,
    ctx: &'a RequestExecutionContext,
    next: ResponseNext<'a>,
  ) -> GraphQLResponse;
}

/// Wraps the execution of a resolved operation.
#[async_trait::async_trait]
pub trait OperationInterceptor: Send + Sync + Debug {
  async fn intercept_operation<'a>(
    &self,
    ctx: &'a OperationContext,
    next: OperationNext<'a>,
  ) -> GraphQLResponse;
}

/// Wraps each root field resolver.
#[async_trait::async_trait]
pub trait RootFieldInterceptor: Send + Sync + Debug {
  async fn intercept_root_field<'a>(
    &self,
    ctx: &'a OperationContext,
    field: &'a FieldInfo,
    next: RootFieldNext<'a>,
  ) -> Result<Value, GraphQLError>;
}

/// Wraps every field resolver, root fields included.
///
/// Sibling fields may resolve concurrently, so implementations must not assume exclusive
/// access to context state.
#[async_trait::async_trait]
pub trait FieldInterceptor: Send + Sync + Debug {
  async fn intercept_field<'a>(
    &self,
    ctx: &'a OperationContext,
    field: &'a FieldInfo,
    next: FieldNext<'a>,
  ) -> Result<Value, GraphQLError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
  /// Response path of the field, e.g. `["users", 0, "name"]`.
  pub path: Vec<Value>,
  pub parent_type: String,
  pub field_name: String,
  /// Alias when present, field name otherwise.
  pub response_key: String,
  pub arguments: Map<String, Value>,
}

/// Handle on the rest of the response chain.
///
/// Consumed by [`ResponseNext::run`], so a hook can call it at most once. Dropping it without
/// running short-circuits every inner hook and the executor.
pub struct ResponseNext<'a> {
  ctx: &'a RequestExecutionContext,
  chain: &'a [Arc<dyn ResponseInterceptor>],
  handler: ResponseFuture<'a>,
}

impl<'a> ResponseNext<'a> {
  pub fn new(
    ctx: &'a RequestExecutionContext,
    chain: &'a [Arc<dyn ResponseInterceptor>],
    handler: ResponseFuture<'a>,
  ) -> Self {
    ResponseNext {
      ctx,
      chain,
      handler,
    }
  }

  pub async fn run(self) -> GraphQLResponse {
    match self.chain.split_first() {
      Some((interceptor, rest)) => {
        interceptor
          .intercept_response(self.ctx, ResponseNext::new(self.ctx, rest, self.handler))
          .await
      }
      None => self.handler.await,
    }
  }
}

/// Handle on the rest of the operation chain, ending with the executor.
pub struct OperationNext<'a> {
  ctx: &'a OperationContext,
  chain: &'a [Arc<dyn OperationInterceptor>],
  handler: ResponseFuture<'a>,
}

impl<'a> OperationNext<'a> {
  pub fn new(
    ctx: &'a OperationContext,
    chain: &'a [Arc<dyn OperationInterceptor>],
    handler: ResponseFuture<'a>,
  ) -> Self {
    OperationNext {
      ctx,
      chain,
      handler,
    }
  }

  pub async fn run(self) -> GraphQLResponse {
    match self.chain.split_first() {
      Some((interceptor, rest)) => {
        interceptor
          .intercept_operation(self.ctx, OperationNext::new(self.ctx, rest, self.handler))
          .await
      }
      None => self.handler.await,
    }
  }
}

pub struct RootFieldNext<'a> {
  ctx: &'a OperationContext,
  field: &'a FieldInfo,
  chain: &'a [Arc<dyn RootFieldInterceptor>],
  resolver: ResolverFuture<'a>,
}

impl<'a> RootFieldNext<'a> {
  pub fn new(
    ctx: &'a OperationContext,
    field: &'a FieldInfo,
    chain: &'a [Arc<dyn RootFieldInterceptor>],
    resolver: ResolverFuture<'a>,
  ) -> Self {
    RootFieldNext {
      ctx,
      field,
      chain,
      resolver,
    }
  }

  pub async fn run(self) -> Result<Value, GraphQLError> {
    match self.chain.split_first() {
      Some((interceptor, rest)) => {
        interceptor
          .intercept_root_field(
            self.ctx,
            self.field,
            RootFieldNext::new(self.ctx, self.field, rest, self.resolver),
          )
          .await
      }
      None => self.resolver.await,
    }
  }
}

pub struct FieldNext<'a> {
  ctx: &'a OperationContext,
  field: &'a FieldInfo,
  chain: &'a [Arc<dyn FieldInterceptor>],
  resolver: ResolverFuture<'a>,
}

impl<'a> FieldNext<'a> {
  pub fn new(
    ctx: &'a OperationContext,
    field: &'a FieldInfo,
    chain: &'a [Arc<dyn FieldInterceptor>],
    resolver: ResolverFuture<'a>,
  ) -> Self {
    FieldNext {
      ctx,
      field,
      chain,
      resolver,
    }
  }

  pub async fn run(self) -> Result<Value, GraphQLError> {
    match self.chain.split_first() {
      Some((interceptor, rest)) => {
        interceptor
          .intercept_field(
            self.ctx,
            self.field,
            FieldNext::new(self.ctx, self.field, rest, self.resolver),
          )
          .await
      }
      None => self.resolver.await,
    }
  }
}

/// The resolver-level chains, shared by every operation executed through the same manager.
#[derive(Debug, Clone, Default)]
pub struct FieldMiddleware {
  root: Arc<Vec<Arc<dyn RootFieldInterceptor>>>,
  fields: Arc<Vec<Arc<dyn FieldInterceptor>>>,
}

impl FieldMiddleware {
  pub fn push_root_interceptor(&mut self, interceptor: Arc<dyn RootFieldInterceptor>) {
    Arc::make_mut(&mut self.root).push(interceptor);
  }

  pub fn push_field_interceptor(&mut self, interceptor: Arc<dyn FieldInterceptor>) {
    Arc::make_mut(&mut self.fields).push(interceptor);
  }

  pub fn root_interceptors(&self) -> &[Arc<dyn RootFieldInterceptor>] {
    &self.root
  }

  pub fn field_interceptors(&self) -> &[Arc<dyn FieldInterceptor>] {
    &self.fields
  }
}
