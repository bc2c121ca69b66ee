//! Database access layer.
//!
//! This module provides:
//! - The connection provider (pooled networked backend, direct embedded backend)
//! - Schema introspection and the process-wide schema cache
//! - Probabilistic retention pruning for log-like tables
//! - The startup index catalog
//! - Backend dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod indexes;
pub mod params;
pub mod pool;
pub mod retention;
pub mod schema;
pub mod schema_cache;

pub use indexes::{IndexCatalog, IndexReport, IndexSpec};
pub use params::validate_identifier;
pub use pool::{
    ConnectionHandle, ConnectionProvider, DbConnection, EmbeddedProvider, NetworkedProvider,
    PoolStats,
};
pub use retention::RetentionPruner;
pub use schema::SchemaInspector;
pub use schema_cache::{SchemaCache, SchemaCacheStats};
