use std::{
  any::Any,
  collections::HashMap,
  fmt::{self, Debug},
  future::Future,
  pin::pin,
  sync::{Arc, Mutex, PoisonError, RwLock},
  time::{Duration, Instant, SystemTime},
};

use futures::future::{select, Either};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
  graphql::{
    executable_operation_index, find_fragment, operation_name, root_selection_set, GraphQLError,
    GraphQLResponse, OperationKind, ParsedFragmentDefinition, ParsedGraphQLDocument,
    ParsedOperationDefinition, ParsedSelectionSet, RawParams,
  },
  interceptor::{FieldInfo, FieldMiddleware, FieldNext, ResolverFuture, RootFieldNext},
};

/// The executor core: turns a resolved operation into a response.
///
/// Implementations resolve root fields through [`OperationContext::resolve_root_field`] and
/// nested fields through [`OperationContext::resolve_field`], so field interceptors observe
/// every resolver call.
#[async_trait::async_trait]
pub trait ExecutableSchema: Send + Sync + Debug {
  async fn execute(&self, ctx: &OperationContext) -> GraphQLResponse;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceTiming {
  pub start: Instant,
  pub end: Instant,
}

impl TraceTiming {
  pub fn duration(&self) -> Duration {
    self.end.saturating_duration_since(self.start)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsingStats {
  pub timing: TraceTiming,
  /// The document came from the document cache and was not parsed again.
  pub cache_hit: bool,
}

/// Per-request statistics, including the namespaced slots plugins use for their own state.
pub struct Stats {
  operation_start: Instant,
  operation_start_time: SystemTime,
  parsing: RwLock<Option<ParsingStats>>,
  extensions: RwLock<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl Stats {
  pub fn new() -> Self {
    Stats {
      operation_start: Instant::now(),
      operation_start_time: SystemTime::now(),
      parsing: RwLock::new(None),
      extensions: RwLock::new(HashMap::new()),
    }
  }

  pub fn operation_start(&self) -> Instant {
    self.operation_start
  }

  /// Wall-clock time matching [`Stats::operation_start`].
  pub fn operation_start_time(&self) -> SystemTime {
    self.operation_start_time
  }

  pub fn parsing(&self) -> Option<ParsingStats> {
    *self.parsing.read().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn set_parsing(&self, parsing: ParsingStats) {
    *self.parsing.write().unwrap_or_else(PoisonError::into_inner) = Some(parsing);
  }

  pub fn set_extension<T>(&self, name: &'static str, value: T)
  where
    T: Any + Send + Sync,
  {
    self
      .extensions
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(name, Arc::new(value));
  }

  pub fn get_extension<T>(&self, name: &str) -> Option<Arc<T>>
  where
    T: Any + Send + Sync,
  {
    self
      .extensions
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .get(name)
      .cloned()
      .and_then(|value| value.downcast::<T>().ok())
  }

  /// Returns the slot stored under `name`, creating it with `init` when missing.
  ///
  /// Concurrent callers always observe the same instance.
  pub fn get_or_insert_extension<T>(&self, name: &'static str, init: impl FnOnce() -> T) -> Arc<T>
  where
    T: Any + Send + Sync,
  {
    let mut extensions = self
      .extensions
      .write()
      .unwrap_or_else(PoisonError::into_inner);

    if let Some(existing) = extensions
      .get(name)
      .cloned()
      .and_then(|value| value.downcast::<T>().ok())
    {
      return existing;
    }

    let value = Arc::new(init());
    extensions.insert(name, value.clone());
    value
  }
}

impl Default for Stats {
  fn default() -> Self {
    Self::new()
  }
}

impl Debug for Stats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let extensions = self
      .extensions
      .read()
      .unwrap_or_else(PoisonError::into_inner);
    let mut names: Vec<_> = extensions.keys().collect();
    names.sort();

    f.debug_struct("Stats")
      .field("operation_start", &self.operation_start)
      .field("parsing", &self.parsing())
      .field("extensions", &names)
      .finish()
  }
}

/// State owned by a single request, from the moment it enters the pipeline until its response
/// has been produced.
#[derive(Debug, Default)]
pub struct RequestExecutionContext {
  stats: Stats,
  errors: Mutex<Vec<GraphQLError>>,
  cancellation: CancellationToken,
}

impl RequestExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_cancellation(cancellation: CancellationToken) -> Self {
    RequestExecutionContext {
      stats: Stats::new(),
      errors: Mutex::new(Vec::new()),
      cancellation,
    }
  }

  pub fn stats(&self) -> &Stats {
    &self.stats
  }

  pub fn add_error(&self, error: GraphQLError) {
    self
      .errors
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(error);
  }

  pub fn errors(&self) -> Vec<GraphQLError> {
    self
      .errors
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn take_errors(&self) -> Vec<GraphQLError> {
    std::mem::take(&mut *self.errors.lock().unwrap_or_else(PoisonError::into_inner))
  }

  pub fn cancellation_token(&self) -> &CancellationToken {
    &self.cancellation
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancellation.is_cancelled()
  }

  /// Drives `fut` to completion unless the request gets cancelled first.
  pub async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, GraphQLError> {
    if self.is_cancelled() {
      return Err(GraphQLError::cancelled());
    }

    let cancelled = pin!(self.cancellation.cancelled());
    let fut = pin!(fut);

    match select(cancelled, fut).await {
      Either::Left(_) => Err(GraphQLError::cancelled()),
      Either::Right((output, _)) => Ok(output),
    }
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OperationSelectionError {
  #[error("no operation found in document")]
  NoOperation,
  #[error("operation \"{0}\" not found")]
  UnknownOperation(String),
}

impl From<OperationSelectionError> for GraphQLError {
  fn from(error: OperationSelectionError) -> Self {
    GraphQLError::new(&error.to_string()).with_code("GRAPHQL_VALIDATION_FAILED")
  }
}

/// A resolved, executable operation: the parameters after every mutator ran, the parsed document
/// and the operation picked from it.
#[derive(Debug)]
pub struct OperationContext {
  request: Arc<RequestExecutionContext>,
  params: RawParams,
  document: Arc<ParsedGraphQLDocument>,
  operation: ParsedOperationDefinition,
  field_middleware: FieldMiddleware,
}

impl OperationContext {
  pub fn new(
    request: Arc<RequestExecutionContext>,
    params: RawParams,
    document: Arc<ParsedGraphQLDocument>,
    field_middleware: FieldMiddleware,
  ) -> Result<Self, OperationSelectionError> {
    let requested_name = params
      .operation_name
      .as_deref()
      .filter(|name| !name.is_empty());

    let operation = executable_operation_index(&document, requested_name)
      .and_then(|index| match &document.definitions[index] {
        graphql_parser::query::Definition::Operation(operation) => Some(operation.clone()),
        _ => None,
      })
      .ok_or_else(|| match requested_name {
        Some(name) => OperationSelectionError::UnknownOperation(name.to_string()),
        None => OperationSelectionError::NoOperation,
      })?;

    Ok(OperationContext {
      request,
      params,
      document,
      operation,
      field_middleware,
    })
  }

  pub fn request(&self) -> &RequestExecutionContext {
    &self.request
  }

  pub fn stats(&self) -> &Stats {
    self.request.stats()
  }

  pub fn is_cancelled(&self) -> bool {
    self.request.is_cancelled()
  }

  pub fn params(&self) -> &RawParams {
    &self.params
  }

  pub fn query(&self) -> &str {
    self.params.query.as_deref().unwrap_or_default()
  }

  pub fn variables(&self) -> &Map<String, Value> {
    &self.params.variables
  }

  /// Name of the operation being executed, when it has one.
  pub fn operation_name(&self) -> Option<&str> {
    operation_name(&self.operation)
  }

  pub fn operation(&self) -> &ParsedOperationDefinition {
    &self.operation
  }

  pub fn operation_kind(&self) -> OperationKind {
    OperationKind::of(&self.operation)
  }

  pub fn root_selection_set(&self) -> &ParsedSelectionSet {
    root_selection_set(&self.operation)
  }

  pub fn document(&self) -> &ParsedGraphQLDocument {
    &self.document
  }

  pub fn fragment(&self, name: &str) -> Option<&ParsedFragmentDefinition> {
    find_fragment(&self.document, name)
  }

  /// Runs a root field resolver through the root-field interceptors, then the field
  /// interceptors.
  pub async fn resolve_root_field<'a>(
    &'a self,
    field: &'a FieldInfo,
    resolver: ResolverFuture<'a>,
  ) -> Result<Value, GraphQLError> {
    let inner: ResolverFuture<'a> = Box::pin(
      FieldNext::new(
        self,
        field,
        self.field_middleware.field_interceptors(),
        resolver,
      )
      .run(),
    );

    RootFieldNext::new(
      self,
      field,
      self.field_middleware.root_interceptors(),
      inner,
    )
    .run()
    .await
  }

  pub async fn resolve_field<'a>(
    &'a self,
    field: &'a FieldInfo,
    resolver: ResolverFuture<'a>,
  ) -> Result<Value, GraphQLError> {
    FieldNext::new(
      self,
      field,
      self.field_middleware.field_interceptors(),
      resolver,
    )
    .run()
    .await
  }
}
