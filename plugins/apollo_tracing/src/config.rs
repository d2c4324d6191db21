use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The `apollo_tracing` plugin attaches resolver timings to every response, under
/// `extensions.tracing`, using the [Apollo Tracing](https://github.com/apollographql/apollo-tracing) format.
#[derive(Default, Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ApolloTracingPluginConfig {}
