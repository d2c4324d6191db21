use std::collections::HashSet;

use futures::future::{join_all, BoxFuture};
use graphql_parser::query::{Directive, Field, Selection, TypeCondition};
use serde_json::{Map, Value};
use switchyard_common::{
  execute::{ExecutableSchema, OperationContext},
  graphql::{value_to_json, GraphQLError, GraphQLResponse, OperationKind, ParsedSelectionSet},
  interceptor::{FieldInfo, ResolverFuture},
};
use switchyard_config::StaticDataSourceConfig;

type ParsedField = Field<'static, String>;

/// Serves operations from a static JSON document.
///
/// Each field resolves to the value stored under its name in the parent object. Objects without a
/// `__typename` entry are named after the field that returned them.
#[derive(Debug)]
pub struct StaticDataSchema {
  config: StaticDataSourceConfig,
}

impl StaticDataSchema {
  pub fn new(config: StaticDataSourceConfig) -> Self {
    Self { config }
  }
}

#[async_trait::async_trait]
impl ExecutableSchema for StaticDataSchema {
  #[tracing::instrument(level = "debug", skip_all, name = "StaticDataSchema::execute")]
  async fn execute(&self, ctx: &OperationContext) -> GraphQLResponse {
    let kind = ctx.operation_kind();
    let (root, serial) = match kind {
      OperationKind::Query => (&self.config.data, false),
      OperationKind::Mutation => match &self.config.mutation {
        Some(mutation) => (mutation, true),
        None => return GraphQLResponse::new_error("mutations are not supported"),
      },
      OperationKind::Subscription => {
        return GraphQLResponse::new_error("subscriptions are not supported")
      }
    };

    let type_name = kind.root_type_name().to_string();
    let data = resolve_object(
      ctx,
      type_name.clone(),
      Some(type_name),
      root,
      vec![ctx.root_selection_set()],
      Vec::new(),
      Level::Root { serial },
    )
    .await;

    GraphQLResponse::new_data(data)
  }
}

#[derive(Debug, Clone, Copy)]
enum Level {
  Root { serial: bool },
  Nested,
}

fn resolve_object<'a: 'b, 'b>(
  ctx: &'a OperationContext,
  type_name: String,
  explicit_type: Option<String>,
  object: &'b Map<String, Value>,
  selection_sets: Vec<&'a ParsedSelectionSet>,
  path: Vec<Value>,
  level: Level,
) -> BoxFuture<'b, Value> {
  Box::pin(async move {
    let mut fields = Vec::new();
    let mut visited = HashSet::new();
    for selection_set in selection_sets {
      collect_fields(
        ctx,
        explicit_type.as_deref(),
        selection_set,
        &mut fields,
        &mut visited,
      );
    }

    let type_name: &str = &type_name;
    let (root, serial) = match level {
      Level::Root { serial } => (true, serial),
      Level::Nested => (false, false),
    };

    let entries: Vec<(String, Value)> = if serial {
      let mut entries = Vec::with_capacity(fields.len());
      for (response_key, group) in fields {
        let field_path = child_path(&path, &response_key);
        let entry =
          resolve_field(ctx, type_name, object, response_key, group, field_path, root).await;
        entries.push(entry);
      }

      entries
    } else {
      join_all(fields.into_iter().map(|(response_key, group)| {
        let field_path = child_path(&path, &response_key);
        resolve_field(ctx, type_name, object, response_key, group, field_path, root)
      }))
      .await
    };

    Value::Object(entries.into_iter().collect())
  })
}

fn child_path(path: &[Value], segment: &str) -> Vec<Value> {
  let mut child = path.to_vec();
  child.push(Value::String(segment.to_string()));
  child
}

async fn resolve_field<'a>(
  ctx: &'a OperationContext,
  parent_type: &'a str,
  object: &'a Map<String, Value>,
  response_key: String,
  group: Vec<&'a ParsedField>,
  path: Vec<Value>,
  root: bool,
) -> (String, Value) {
  let field = match group.first() {
    Some(field) => *field,
    None => return (response_key, Value::Null),
  };

  if field.name == "__typename" {
    return (response_key, Value::String(parent_type.to_string()));
  }

  let info = FieldInfo {
    path,
    parent_type: parent_type.to_string(),
    field_name: field.name.clone(),
    response_key,
    arguments: field
      .arguments
      .iter()
      .map(|(name, value)| (name.clone(), value_to_json(value, ctx.variables())))
      .collect(),
  };

  let resolver: ResolverFuture<'_> = Box::pin(async move {
    Ok(object.get(&field.name).cloned().unwrap_or(Value::Null))
  });

  let result = match root {
    true => ctx.resolve_root_field(&info, resolver).await,
    false => ctx.resolve_field(&info, resolver).await,
  };

  let value = match result {
    Ok(value) => {
      let selection_sets: Vec<_> = group
        .iter()
        .map(|field| &field.selection_set)
        .filter(|selection_set| !selection_set.items.is_empty())
        .collect();

      complete_value(ctx, &field.name, value, selection_sets, info.path.clone()).await
    }
    Err(error) => {
      ctx.request().add_error(error.with_path(info.path.clone()));
      Value::Null
    }
  };

  (info.response_key, value)
}

fn complete_value<'a>(
  ctx: &'a OperationContext,
  field_name: &'a str,
  value: Value,
  selection_sets: Vec<&'a ParsedSelectionSet>,
  path: Vec<Value>,
) -> BoxFuture<'a, Value> {
  Box::pin(async move {
    if selection_sets.is_empty() {
      return value;
    }

    match value {
      Value::Null => Value::Null,
      Value::Object(object) => {
        let explicit_type = object
          .get("__typename")
          .and_then(Value::as_str)
          .map(str::to_string);
        let type_name = explicit_type
          .clone()
          .unwrap_or_else(|| default_type_name(field_name));

        resolve_object(
          ctx,
          type_name,
          explicit_type,
          &object,
          selection_sets,
          path,
          Level::Nested,
        )
        .await
      }
      Value::Array(items) => {
        let items = items.into_iter().enumerate().map(|(index, item)| {
          let mut item_path = path.clone();
          item_path.push(Value::from(index));
          complete_value(ctx, field_name, item, selection_sets.clone(), item_path)
        });

        Value::Array(join_all(items).await)
      }
      _ => {
        ctx.request().add_error(
          GraphQLError::new(&format!(
            "field \"{}\" returned a leaf value but has a selection set",
            field_name
          ))
          .with_path(path),
        );

        Value::Null
      }
    }
  })
}

fn default_type_name(field_name: &str) -> String {
  let mut chars = field_name.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

/// Flattens a selection set into its fields, grouped by response key in selection order.
fn collect_fields<'a>(
  ctx: &'a OperationContext,
  explicit_type: Option<&str>,
  selection_set: &'a ParsedSelectionSet,
  fields: &mut Vec<(String, Vec<&'a ParsedField>)>,
  visited: &mut HashSet<&'a str>,
) {
  for selection in selection_set.items.iter() {
    match selection {
      Selection::Field(field) => {
        if !should_include(&field.directives, ctx) {
          continue;
        }

        let response_key = field.alias.as_ref().unwrap_or(&field.name);
        match fields.iter_mut().find(|(key, _)| key == response_key) {
          Some((_, group)) => group.push(field),
          None => fields.push((response_key.clone(), vec![field])),
        }
      }
      Selection::InlineFragment(inline) => {
        if should_include(&inline.directives, ctx)
          && type_condition_matches(inline.type_condition.as_ref(), explicit_type)
        {
          collect_fields(ctx, explicit_type, &inline.selection_set, fields, visited);
        }
      }
      Selection::FragmentSpread(spread) => {
        if !should_include(&spread.directives, ctx) || !visited.insert(&spread.fragment_name) {
          continue;
        }

        if let Some(fragment) = ctx.fragment(&spread.fragment_name) {
          if type_condition_matches(Some(&fragment.type_condition), explicit_type) {
            collect_fields(ctx, explicit_type, &fragment.selection_set, fields, visited);
          }
        }
      }
    }
  }
}

fn type_condition_matches(
  condition: Option<&TypeCondition<'static, String>>,
  explicit_type: Option<&str>,
) -> bool {
  match (condition, explicit_type) {
    (Some(TypeCondition::On(condition)), Some(explicit_type)) => condition == explicit_type,
    _ => true,
  }
}

fn should_include(directives: &[Directive<'static, String>], ctx: &OperationContext) -> bool {
  directives.iter().all(|directive| {
    let condition = directive
      .arguments
      .iter()
      .find(|(name, _)| name == "if")
      .map(|(_, value)| value_to_json(value, ctx.variables()));

    !matches!(
      (directive.name.as_str(), condition),
      ("skip", Some(Value::Bool(true))) | ("include", Some(Value::Bool(false)))
    )
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use serde_json::json;
  use switchyard_common::{
    execute::RequestExecutionContext,
    graphql::{parse_graphql_operation, RawParams},
    interceptor::{FieldInterceptor, FieldMiddleware, FieldNext},
  };

  use super::*;

  #[derive(Debug, Default)]
  struct PathRecorder {
    paths: Mutex<Vec<Value>>,
  }

  #[async_trait::async_trait]
  impl FieldInterceptor for PathRecorder {
    async fn intercept_field<'a>(
      &self,
      _ctx: &'a OperationContext,
      field: &'a FieldInfo,
      next: FieldNext<'a>,
    ) -> Result<Value, GraphQLError> {
      self.paths.lock().unwrap().push(Value::Array(field.path.clone()));
      if field.field_name == "secret" {
        return Err(GraphQLError::new("forbidden"));
      }

      next.run().await
    }
  }

  fn schema() -> StaticDataSchema {
    StaticDataSchema::new(StaticDataSourceConfig {
      data: json!({
        "name": "test",
        "me": { "__typename": "User", "name": "Ada", "secret": "s3cr3t" },
        "users": [{ "name": "Ada", "email": "ada@example.com" }, { "name": "Grace", "email": null }]
      })
      .as_object()
      .cloned()
      .unwrap(),
      mutation: Some(json!({ "rename": true }).as_object().cloned().unwrap()),
    })
  }

  async fn execute_with(
    params: RawParams,
    middleware: FieldMiddleware,
  ) -> (GraphQLResponse, Arc<RequestExecutionContext>) {
    let request = Arc::new(RequestExecutionContext::new());
    let document = Arc::new(parse_graphql_operation(params.query.as_deref().unwrap()).unwrap());
    let ctx = OperationContext::new(request.clone(), params, document, middleware).unwrap();

    (schema().execute(&ctx).await, request)
  }

  async fn execute(query: &str) -> (GraphQLResponse, Arc<RequestExecutionContext>) {
    execute_with(RawParams::new(query), FieldMiddleware::default()).await
  }

  #[tokio::test]
  async fn resolves_fields_and_aliases() {
    let (response, _) = execute("{ name alias: name __typename me { __typename name } }").await;

    assert_eq!(
      response.data,
      Some(json!({
        "name": "test",
        "alias": "test",
        "__typename": "Query",
        "me": { "__typename": "User", "name": "Ada" }
      }))
    );
  }

  #[tokio::test]
  async fn resolves_lists_and_fragments() {
    let (response, _) = execute(
      "{ users { ...UserFields } missing } fragment UserFields on Users { name ... on Users { email } }",
    )
    .await;

    assert_eq!(
      response.data,
      Some(json!({
        "users": [
          { "name": "Ada", "email": "ada@example.com" },
          { "name": "Grace", "email": null }
        ],
        "missing": null
      }))
    );
  }

  #[tokio::test]
  async fn honors_skip_and_include() {
    let mut params = RawParams::new("query ($skip: Boolean!) { name @skip(if: $skip) me @include(if: false) { name } users { name } }");
    params.variables.insert("skip".to_string(), json!(true));

    let (response, _) = execute_with(params, FieldMiddleware::default()).await;

    assert_eq!(
      response.data,
      Some(json!({ "users": [{ "name": "Ada" }, { "name": "Grace" }] }))
    );
  }

  #[tokio::test]
  async fn field_errors_become_null_with_path() {
    let recorder = Arc::new(PathRecorder::default());
    let mut middleware = FieldMiddleware::default();
    middleware.push_field_interceptor(recorder.clone());

    let (response, request) =
      execute_with(RawParams::new("{ me { name secret } users { name } }"), middleware).await;

    assert_eq!(
      response.data,
      Some(json!({
        "me": { "name": "Ada", "secret": null },
        "users": [{ "name": "Ada" }, { "name": "Grace" }]
      }))
    );

    let errors = request.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "forbidden");
    assert_eq!(errors[0].path, Some(vec![json!("me"), json!("secret")]));

    let paths = recorder.paths.lock().unwrap();
    assert_eq!(paths.len(), 6);
    assert!(paths.contains(&json!(["users", 1, "name"])));
  }

  #[tokio::test]
  async fn mutations_and_subscriptions() {
    let (response, _) = execute("mutation { rename __typename }").await;
    assert_eq!(
      response.data,
      Some(json!({ "rename": true, "__typename": "Mutation" }))
    );

    let (response, _) = execute("subscription { name }").await;
    assert_eq!(
      response,
      GraphQLResponse::new_error("subscriptions are not supported")
    );
  }

  #[tokio::test]
  async fn reports_selections_on_leaf_values() {
    let (response, request) = execute("{ name { length } }").await;

    assert_eq!(response.data, Some(json!({ "name": null })));
    assert_eq!(request.errors()[0].path, Some(vec![json!("name")]));
  }
}
