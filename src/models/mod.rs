//! Data models for the workflow store.
//!
//! This module re-exports all model types used throughout the application.

pub mod backend;
pub mod retention;
pub mod schema;

// Re-export commonly used types
pub use backend::{BackendConfig, BackendKind};
pub use retention::{
    DEPLOYMENT_LOGS_TABLE, PruneDecision, PruneOutcome, RetentionScope, RetentionTarget,
    RetentionWindow, ScopeValue,
};
pub use schema::{ColumnDescriptor, SchemaKey};
