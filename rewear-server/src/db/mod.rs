//! Database connection and schema bootstrap

pub mod pool;
pub mod schema;

pub use pool::{create_pool, create_pool_with_options};
