//! rewear-server: storage and HTTP API for the clothing exchange
//!
//! - `models`: entities, request bodies and their validation
//! - `store`: the `MarketplaceStore` trait with PostgreSQL and in-memory backends
//! - `db`: connection pool and schema bootstrap
//! - `http`: axum router, extractors and error mapping

pub mod db;
pub mod http;
pub mod models;
pub mod store;

pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use store::{MarketplaceStore, MemoryStore, PgStore, StoreError};
