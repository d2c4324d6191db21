mod config;
mod plugin;

#[cfg(test)]
mod test;

pub use config::ApqPluginConfig as Config;
pub use plugin::get_apq_stats;
pub use plugin::ApqError;
pub use plugin::ApqStats;
pub use plugin::AutomaticPersistedQueriesPlugin as Plugin;
pub use plugin::APQ_STATS_NAME;
