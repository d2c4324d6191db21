pub mod executor;
pub mod plugin_manager;
pub mod static_schema;
