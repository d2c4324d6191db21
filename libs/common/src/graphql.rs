use std::fmt::{Display, Formatter};

use graphql_parser::{
  parse_query,
  query::{Definition, Document, FragmentDefinition, OperationDefinition, Selection, SelectionSet},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub use graphql_parser::query::ParseError;

pub type ParsedGraphQLDocument = Document<'static, String>;
pub type ParsedOperationDefinition = OperationDefinition<'static, String>;
pub type ParsedFragmentDefinition = FragmentDefinition<'static, String>;
pub type ParsedSelectionSet = SelectionSet<'static, String>;
pub type ParsedValue = graphql_parser::query::Value<'static, String>;

/// The decoded, unresolved shape of an incoming GraphQL operation.
///
/// Transports produce this from the wire payload `{query, operationName, variables, extensions}`.
/// Parameter mutators may rewrite it before the executor ever sees it.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RawParams {
  // The GraphQL operation, as string. Might be absent when a persisted query hash is sent instead.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub query: Option<String>,
  // The operation name, if specified
  #[serde(
    rename = "operationName",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub operation_name: Option<String>,
  // GraphQL operation variables, in JSON format
  #[serde(
    default,
    deserialize_with = "null_as_empty_map",
    skip_serializing_if = "Map::is_empty"
  )]
  pub variables: Map<String, Value>,
  // Vendor extensions, in JSON format
  #[serde(
    default,
    deserialize_with = "null_as_empty_map",
    skip_serializing_if = "Map::is_empty"
  )]
  pub extensions: Map<String, Value>,
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawParams {
  pub fn new(query: impl Into<String>) -> Self {
    RawParams {
      query: Some(query.into()),
      ..Default::default()
    }
  }

  pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(contents)
  }

  /// `true` when a non-empty query text is present.
  pub fn has_query(&self) -> bool {
    self.query.as_deref().is_some_and(|query| !query.is_empty())
  }
}

impl Display for RawParams {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match serde_json::to_string(self) {
      Ok(json) => write!(f, "{}", json),
      Err(e) => write!(f, "<unserializable params: {}>", e),
    }
  }
}

/// An error with a message and optional extensions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphQLError {
  /// The error message.
  pub message: String,
  /// Path of the field that produced the error, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<Vec<Value>>,
  /// Extensions to the error.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Map<String, Value>>,
}

impl Display for GraphQLError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.message)
  }
}

impl GraphQLError {
  pub fn new(message: &str) -> Self {
    GraphQLError {
      message: message.to_string(),
      path: None,
      extensions: None,
    }
  }

  pub fn with_code(mut self, code: &str) -> Self {
    self
      .extensions
      .get_or_insert_with(Map::new)
      .insert("code".to_string(), Value::String(code.to_string()));
    self
  }

  pub fn with_path(mut self, path: Vec<Value>) -> Self {
    self.path = Some(path);
    self
  }

  pub fn code(&self) -> Option<&str> {
    self
      .extensions
      .as_ref()
      .and_then(|extensions| extensions.get("code"))
      .and_then(|code| code.as_str())
  }

  pub fn cancelled() -> Self {
    GraphQLError::new("request cancelled").with_code("REQUEST_CANCELLED")
  }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct GraphQLResponse {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub errors: Option<Vec<GraphQLError>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Map<String, Value>>,
}

impl GraphQLResponse {
  pub fn new_data(data: Value) -> Self {
    GraphQLResponse {
      data: Some(data),
      ..Default::default()
    }
  }

  pub fn new_error(error: &str) -> Self {
    GraphQLError::new(error).into()
  }

  pub fn append_errors(&mut self, errors: Vec<GraphQLError>) {
    if errors.is_empty() {
      return;
    }

    self.errors.get_or_insert_with(Vec::new).extend(errors);
  }

  pub fn append_extensions(&mut self, extensions: Map<String, Value>) {
    self
      .extensions
      .get_or_insert_with(Map::new)
      .extend(extensions);
  }

  pub fn has_errors(&self) -> bool {
    self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
  }
}

impl From<GraphQLError> for GraphQLResponse {
  fn from(error: GraphQLError) -> Self {
    GraphQLResponse {
      data: None,
      errors: Some(vec![error]),
      extensions: None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Query,
  Mutation,
  Subscription,
}

impl OperationKind {
  pub fn of(operation: &ParsedOperationDefinition) -> Self {
    match operation {
      OperationDefinition::SelectionSet(_) | OperationDefinition::Query(_) => OperationKind::Query,
      OperationDefinition::Mutation(_) => OperationKind::Mutation,
      OperationDefinition::Subscription(_) => OperationKind::Subscription,
    }
  }

  pub fn root_type_name(&self) -> &'static str {
    match self {
      OperationKind::Query => "Query",
      OperationKind::Mutation => "Mutation",
      OperationKind::Subscription => "Subscription",
    }
  }
}

pub fn parse_graphql_operation(operation_str: &str) -> Result<ParsedGraphQLDocument, ParseError> {
  parse_query::<String>(operation_str).map(|v| v.into_static())
}

pub fn operation_name(operation: &ParsedOperationDefinition) -> Option<&str> {
  match operation {
    OperationDefinition::SelectionSet(_) => None,
    OperationDefinition::Query(query) => query.name.as_deref(),
    OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
    OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
  }
}

pub fn root_selection_set(operation: &ParsedOperationDefinition) -> &ParsedSelectionSet {
  match operation {
    OperationDefinition::SelectionSet(selection_set) => selection_set,
    OperationDefinition::Query(query) => &query.selection_set,
    OperationDefinition::Mutation(mutation) => &mutation.selection_set,
    OperationDefinition::Subscription(subscription) => &subscription.selection_set,
  }
}

/// Position of the operation to execute within `document.definitions`.
///
/// With an operation name, the operation carrying that name is picked. Without one, the first
/// operation of the document is used.
pub fn executable_operation_index(
  document: &ParsedGraphQLDocument,
  requested_name: Option<&str>,
) -> Option<usize> {
  document
    .definitions
    .iter()
    .position(|definition| match (definition, requested_name) {
      (Definition::Operation(operation), Some(requested)) => {
        operation_name(operation) == Some(requested)
      }
      (Definition::Operation(_), None) => true,
      _ => false,
    })
}

pub fn find_fragment<'a>(
  document: &'a ParsedGraphQLDocument,
  name: &str,
) -> Option<&'a ParsedFragmentDefinition> {
  document
    .definitions
    .iter()
    .find_map(|definition| match definition {
      Definition::Fragment(fragment) if fragment.name == name => Some(fragment),
      _ => None,
    })
}

pub fn is_introspection_operation(operation: &ParsedOperationDefinition) -> bool {
  let selections = match operation {
    OperationDefinition::SelectionSet(s) => s,
    OperationDefinition::Query(q) => &q.selection_set,
    _ => return false,
  };

  let all_typename = selections.items.iter().all(|v| {
    // TODO: resolve fragment spreads before deciding, `{ ...F }` is never treated as introspection
    if let Selection::Field(field) = v {
      return field.name == "__typename";
    }

    false
  });

  if all_typename && !selections.items.is_empty() {
    return true;
  }

  selections.items.iter().any(|v| {
    if let Selection::Field(field) = v {
      return field.name == "__schema" || field.name == "__type";
    }

    false
  })
}

/// Converts a GraphQL literal into JSON, substituting variables from the request.
pub fn value_to_json(value: &ParsedValue, variables: &Map<String, Value>) -> Value {
  use graphql_parser::query::Value as GqlValue;

  match value {
    GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
    GqlValue::Int(number) => number.as_i64().map(Value::from).unwrap_or(Value::Null),
    GqlValue::Float(float) => serde_json::Number::from_f64(*float)
      .map(Value::Number)
      .unwrap_or(Value::Null),
    GqlValue::String(string) => Value::String(string.clone()),
    GqlValue::Boolean(boolean) => Value::Bool(*boolean),
    GqlValue::Null => Value::Null,
    GqlValue::Enum(name) => Value::String(name.clone()),
    GqlValue::List(items) => Value::Array(
      items
        .iter()
        .map(|item| value_to_json(item, variables))
        .collect(),
    ),
    GqlValue::Object(fields) => Value::Object(
      fields
        .iter()
        .map(|(key, item)| (key.clone(), value_to_json(item, variables)))
        .collect(),
    ),
  }
}
