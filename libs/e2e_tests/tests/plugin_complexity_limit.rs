use std::sync::Arc;

use e2e::suite::TestSuite;
use serde_json::json;
use switchyard_common::plugin::Plugin;
use tokio::test;

fn suite(max_complexity: usize) -> TestSuite {
  TestSuite {
    plugins: vec![Arc::new(complexity_limit_plugin::Plugin::new(max_complexity)) as Arc<dyn Plugin>],
    data: json!({
      "me": { "name": "test", "friends": [{ "name": "a" }, { "name": "b" }] }
    }),
  }
}

static QUERY: &str = r#"
  query {
    me {
      ...Person
      friends { ...Person }
    }
  }

  fragment Person on User { name }
"#;

#[test]
async fn operations_within_the_limit_execute() {
  let response = suite(4).run_query(QUERY).await;

  assert_eq!(response.errors, None);
  assert_eq!(
    response.data,
    Some(json!({
      "me": { "name": "test", "friends": [{ "name": "a" }, { "name": "b" }] }
    }))
  );
}

#[test]
async fn operations_over_the_limit_are_rejected() {
  let response = suite(3).run_query(QUERY).await;

  assert_eq!(response.data, None);
  let errors = response.errors.unwrap();
  assert_eq!(
    errors[0].message,
    "operation has complexity 4, which exceeds the limit of 3"
  );
  assert_eq!(errors[0].code(), Some("COMPLEXITY_LIMIT_EXCEEDED"));
}
