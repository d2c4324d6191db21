mod complexity;
mod config;
mod plugin;

pub use complexity::operation_complexity;
pub use config::ComplexityLimitPluginConfig as Config;
pub use plugin::get_complexity_stats;
pub use plugin::ComplexityLimitPlugin as Plugin;
pub use plugin::ComplexityStats;
pub use plugin::COMPLEXITY_STATS_NAME;
