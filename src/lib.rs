//! Workflow Store Library
//!
//! Data-access layer for workflow deployments that runs unchanged on an
//! embedded SQLite file or a pooled PostgreSQL server. It provides scoped
//! connections, a schema cache and probabilistic retention pruning for
//! log tables.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use store::DataStore;
