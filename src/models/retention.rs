//! Retention models for log-like tables.
//!
//! A `RetentionTarget` names the table and columns a prune operates on; a
//! `RetentionWindow` says how much of it to keep.

use crate::db::params::validate_identifier;
use crate::error::DbResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Table that stores per-deployment invocation logs.
pub const DEPLOYMENT_LOGS_TABLE: &str = "deployment_logs";

/// Value of the scope column a prune is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Integer(i64),
    Text(String),
}

impl From<i64> for ScopeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for ScopeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ScopeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl std::fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Restricts a prune to rows whose `column` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionScope {
    pub column: String,
    pub value: ScopeValue,
}

/// The table and ordering a prune operates on.
///
/// Rows are ranked by `recency_column` descending, then `tie_break_column`
/// descending, so the "most recent N" boundary is deterministic even when
/// timestamps collide. All identifiers are validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionTarget {
    pub table: String,
    pub id_column: String,
    pub recency_column: String,
    pub tie_break_column: String,
    pub scope: Option<RetentionScope>,
}

impl RetentionTarget {
    /// Create a target with the default `id` / `created_at` columns and no scope.
    pub fn new(table: impl Into<String>) -> DbResult<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self {
            table,
            id_column: "id".to_string(),
            recency_column: "created_at".to_string(),
            tie_break_column: "id".to_string(),
            scope: None,
        })
    }

    /// The deployment log table scoped to one deployment.
    pub fn deployment_logs(deployment_id: impl Into<ScopeValue>) -> Self {
        Self {
            table: DEPLOYMENT_LOGS_TABLE.to_string(),
            id_column: "id".to_string(),
            recency_column: "created_at".to_string(),
            tie_break_column: "id".to_string(),
            scope: Some(RetentionScope {
                column: "deployment_id".to_string(),
                value: deployment_id.into(),
            }),
        }
    }

    /// Restrict pruning to rows where `column = value`.
    pub fn with_scope(
        mut self,
        column: impl Into<String>,
        value: impl Into<ScopeValue>,
    ) -> DbResult<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.scope = Some(RetentionScope {
            column,
            value: value.into(),
        });
        Ok(self)
    }

    /// Set the primary identifier column. It also breaks recency ties.
    pub fn with_id_column(mut self, column: impl Into<String>) -> DbResult<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.tie_break_column = column.clone();
        self.id_column = column;
        Ok(self)
    }

    /// Set the indexed recency column.
    pub fn with_recency_column(mut self, column: impl Into<String>) -> DbResult<Self> {
        let column = column.into();
        validate_identifier(&column)?;
        self.recency_column = column;
        Ok(self)
    }

}

/// How much of a scoped table a prune keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionWindow {
    /// Keep the N most recent rows.
    MaxRows(u32),
    /// Keep rows newer than now minus this age.
    MaxAge(Duration),
}

impl std::fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxRows(n) => write!(f, "{} rows", n),
            Self::MaxAge(age) => write!(f, "{}s", age.as_secs()),
        }
    }
}

/// Outcome of the per-write coin flip. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneDecision {
    Skip,
    Prune,
}

/// What `after_write` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PruneOutcome {
    /// The coin flip said no; the backend was not touched.
    Skipped,
    Pruned { deleted: u64 },
    /// The prune ran and failed; the error was logged and swallowed.
    Failed,
}

impl PruneOutcome {
    /// Whether a prune attempt reached the backend.
    pub fn was_attempted(&self) -> bool {
        !matches!(self, Self::Skipped)
    }
}
