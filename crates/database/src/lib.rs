//! kobosync catalog layer
//!
//! Reads and updates the e-reader's own SQLite library database. Queries
//! are plain functions over the connection held by a [`CatalogStore`].

pub mod connection;
pub mod queries;
pub mod schema;

pub use connection::{CatalogStore, DatabaseConfig, DbPool};
pub use schema::{create_catalog_schema, register_content};
