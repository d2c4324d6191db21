use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema, PartialEq)]
pub struct LoggerConfig {
  /// Environment filter directives, e.g. `info` or `switchyard_engine=debug,apq_plugin=trace`.
  ///
  /// See [tracing_subscriber::EnvFilter](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html) for the full syntax.
  #[serde(default = "default_log_filter")]
  pub filter: String,
  /// Configures the logger format.
  ///
  /// By default, `compact` is used in TTY environments, and `json` is used in non-TTY environments.
  #[serde(default)]
  pub format: LoggerConfigFormat,
  /// Emits a `close` event with timings for every instrumented span of the pipeline.
  #[serde(default)]
  pub print_performance_info: bool,
}

impl Default for LoggerConfig {
  fn default() -> Self {
    Self {
      filter: default_log_filter(),
      format: LoggerConfigFormat::default(),
      print_performance_info: false,
    }
  }
}

fn default_log_filter() -> String {
  "info".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, JsonSchema, PartialEq)]
pub enum LoggerConfigFormat {
  /// Minimal, compact logs containing the essential parts of each message and its fields.
  #[serde(rename = "compact")]
  #[schemars(title = "compact")]
  Compact,

  /// Verbose, multi-line output with well-formatted fields and context. Ideal for development.
  #[serde(rename = "pretty")]
  #[schemars(title = "pretty")]
  Pretty,

  /// One JSON object per event, for log aggregators and analysis systems.
  #[serde(rename = "json")]
  #[schemars(title = "json")]
  Json,
}

impl Default for LoggerConfigFormat {
  // In development, we wish to see some more details and code locations.
  #[cfg(debug_assertions)]
  fn default() -> Self {
    LoggerConfigFormat::Pretty
  }

  #[cfg(not(debug_assertions))]
  fn default() -> Self {
    // stdout carries responses, so logs go to stderr
    if atty::is(atty::Stream::Stderr) {
      LoggerConfigFormat::Compact
    } else {
      LoggerConfigFormat::Json
    }
  }
}
