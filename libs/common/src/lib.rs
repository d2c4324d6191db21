pub mod cache;
pub mod execute;
pub mod graphql;
pub mod interceptor;
pub mod plugin;
