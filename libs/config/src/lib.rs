pub mod interpolate;

use std::{fs::read_to_string, path::Path};

use interpolate::interpolate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub use switchyard_cache::{CacheStoreConfig, InMemoryConfig};
pub use switchyard_logger::{LoggerConfig, LoggerConfigFormat};

/// This section describes the top-level configuration object for Switchyard.
///
/// Switchyard supports both YAML and JSON format for the configuration file. The file is passed as
/// the first argument of the binary, and defaults to `config.json` in the current directory.
///
/// Values can reference environment variables with `$VAR`, `${VAR}`, `${VAR:-default}` and
/// `${VAR:?error}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct SwitchyardConfig {
  /// Configuration for the logger.
  #[serde(default)]
  pub logger: LoggerConfig,
  /// Cache for parsed GraphQL documents, keyed by operation text.
  #[serde(default)]
  pub document_cache: CacheStoreConfig,
  /// The data served by the executor.
  pub source: StaticDataSourceConfig,
  /// Plugins applied to every request, in the order they are listed.
  #[serde(default)]
  pub plugins: Vec<PluginDefinition>,
}

/// A static data document. Every field of an operation is resolved by looking up its name in the
/// JSON object of the parent.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default, JsonSchema)]
pub struct StaticDataSourceConfig {
  /// Root value for `query` operations.
  pub data: Map<String, Value>,
  /// Root value for `mutation` operations. Mutations are rejected when this is not set.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mutation: Option<Map<String, Value>>,
}

fn default_plugin_enabled() -> Option<bool> {
  Some(true)
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type")]
pub enum PluginDefinition {
  #[serde(rename = "automatic_persisted_queries")]
  /// Configuration for the Automatic Persisted Queries plugin.
  AutomaticPersistedQueriesPlugin {
    #[serde(
      default = "default_plugin_enabled",
      skip_serializing_if = "Option::is_none"
    )]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<apq_plugin::Config>,
  },

  #[serde(rename = "disable_introspection")]
  /// Configuration for the Disable Introspection plugin.
  DisableIntrospectionPlugin {
    #[serde(
      default = "default_plugin_enabled",
      skip_serializing_if = "Option::is_none"
    )]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<disable_introspection_plugin::Config>,
  },

  #[serde(rename = "complexity_limit")]
  ComplexityLimitPlugin {
    #[serde(
      default = "default_plugin_enabled",
      skip_serializing_if = "Option::is_none"
    )]
    enabled: Option<bool>,
    config: complexity_limit_plugin::Config,
  },

  #[serde(rename = "apollo_tracing")]
  ApolloTracingPlugin {
    #[serde(
      default = "default_plugin_enabled",
      skip_serializing_if = "Option::is_none"
    )]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<apollo_tracing_plugin::Config>,
  },
}

impl PluginDefinition {
  pub fn enabled(&self) -> bool {
    let enabled = match self {
      PluginDefinition::AutomaticPersistedQueriesPlugin { enabled, .. } => enabled,
      PluginDefinition::DisableIntrospectionPlugin { enabled, .. } => enabled,
      PluginDefinition::ComplexityLimitPlugin { enabled, .. } => enabled,
      PluginDefinition::ApolloTracingPlugin { enabled, .. } => enabled,
    };

    enabled.unwrap_or(true)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file \"{path}\": {source}")]
  Read {
    path: String,
    source: std::io::Error,
  },
  #[error("unsupported config file extension for \"{0}\", expected .json, .yaml or .yml")]
  UnsupportedFormat(String),
  #[error("failed to interpolate config file: {}", .0.join("; "))]
  Interpolation(Vec<String>),
  #[error("failed to parse JSON config file: {0}")]
  Json(#[from] serde_json::Error),
  #[error("failed to parse YAML config file: {0}")]
  Yaml(#[from] serde_yaml::Error),
}

#[tracing::instrument(level = "debug", skip(get_env_value))]
pub fn load_config(
  file_path: &str,
  get_env_value: impl Fn(&str) -> Option<String>,
) -> Result<SwitchyardConfig, ConfigError> {
  let path = Path::new(file_path);
  let format = ConfigFormat::from_path(path)?;

  let raw_contents = read_to_string(path).map_err(|source| ConfigError::Read {
    path: file_path.to_string(),
    source,
  })?;

  parse_config_contents(raw_contents, format, get_env_value)
}

pub fn parse_config_contents(
  contents: String,
  format: ConfigFormat,
  get_env_value: impl Fn(&str) -> Option<String>,
) -> Result<SwitchyardConfig, ConfigError> {
  let (config_string, warnings) =
    interpolate(&contents, get_env_value).map_err(ConfigError::Interpolation)?;

  for warning in warnings {
    warn!("{}", warning);
  }

  match format {
    ConfigFormat::Json => parse_config_from_json(&config_string),
    ConfigFormat::Yaml => parse_config_from_yaml(&config_string),
  }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, JsonSchema, Default)]
pub enum ConfigFormat {
  #[default]
  Json,
  Yaml,
}

impl ConfigFormat {
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("json") => Ok(ConfigFormat::Json),
      Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
      _ => Err(ConfigError::UnsupportedFormat(
        path.to_string_lossy().into_owned(),
      )),
    }
  }
}

fn parse_config_from_yaml(contents: &str) -> Result<SwitchyardConfig, ConfigError> {
  Ok(serde_yaml::from_str::<SwitchyardConfig>(contents)?)
}

fn parse_config_from_json(contents: &str) -> Result<SwitchyardConfig, ConfigError> {
  Ok(serde_json::from_str::<SwitchyardConfig>(contents)?)
}
