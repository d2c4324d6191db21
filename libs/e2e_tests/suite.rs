use std::sync::Arc;

use serde_json::{json, Value};
use switchyard_common::{
  graphql::{GraphQLResponse, RawParams},
  plugin::Plugin,
};
use switchyard_config::StaticDataSourceConfig;
use switchyard_engine::{executor::Executor, static_schema::StaticDataSchema};

pub struct TestSuite {
  pub plugins: Vec<Arc<dyn Plugin>>,
  /// Root value served for queries.
  pub data: Value,
}

impl Default for TestSuite {
  fn default() -> Self {
    TestSuite {
      plugins: vec![],
      data: json!({ "name": "test" }),
    }
  }
}

impl TestSuite {
  pub fn executor(self) -> Arc<Executor> {
    let schema = StaticDataSchema::new(StaticDataSourceConfig {
      data: self.data.as_object().cloned().unwrap_or_default(),
      mutation: None,
    });

    Arc::new(Executor::new_test(Arc::new(schema), self.plugins).unwrap())
  }

  pub async fn run_graphql_request(self, params: RawParams) -> GraphQLResponse {
    self.executor().execute(params).await
  }

  pub async fn run_query(self, query: &str) -> GraphQLResponse {
    self.run_graphql_request(RawParams::new(query)).await
  }
}
