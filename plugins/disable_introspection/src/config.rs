use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Default, Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
/// The `disable_introspection` plugin allows you to disable introspection for your GraphQL API.
///
/// A [GraphQL introspection query](https://graphql.org/learn/introspection/) is a special GraphQL query that returns information about the GraphQL schema of your API.
///
/// Operations selecting `__schema` or `__type` at the root, or selecting nothing but `__typename`, are rejected before they reach the executor.
pub struct DisableIntrospectionPluginConfig {}
