mod config;
mod plugin;

pub use config::ApolloTracingPluginConfig as Config;
pub use plugin::ApolloTracingPlugin as Plugin;
pub use plugin::{ResolverTiming, TracingRecorder, APOLLO_TRACING_NAME};
