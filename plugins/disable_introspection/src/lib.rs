mod config;
mod plugin;

pub use config::DisableIntrospectionPluginConfig as Config;
pub use plugin::DisableIntrospectionPlugin as Plugin;
