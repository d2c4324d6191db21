use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The `complexity_limit` plugin rejects operations that select too many fields.
///
/// Every selected field costs 1, nested fields included. Fragment spreads are expanded and
/// counted at every place they are used.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct ComplexityLimitPluginConfig {
  /// The highest complexity an operation may have. Must be greater than zero.
  pub max_complexity: usize,
}
