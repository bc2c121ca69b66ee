//! Index catalog applied once at startup.
//!
//! The pruner's delete and the usual list queries rely on these. Every
//! statement is `CREATE INDEX IF NOT EXISTS` and identical on both backends,
//! so applying the catalog again is harmless.

use crate::db::pool::{ConnectionProvider, DbConnection};
use crate::db::schema::SchemaInspector;
use crate::error::{DbError, DbResult};
use serde::Serialize;
use tracing::{info, warn};

/// One index definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: &'static str,
    pub table: &'static str,
    /// Column list as written inside the parentheses
    pub columns: &'static str,
}

impl IndexSpec {
    const fn new(name: &'static str, table: &'static str, columns: &'static str) -> Self {
        Self {
            name,
            table,
            columns,
        }
    }

    pub fn create_statement(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            self.name, self.table, self.columns
        )
    }
}

const CATALOG: &[IndexSpec] = &[
    IndexSpec::new("idx_workflows_created_at", "workflows", "created_at DESC"),
    IndexSpec::new("idx_workflows_name", "workflows", "name"),
    IndexSpec::new("idx_deployments_workflow_id", "deployments", "workflow_id"),
    IndexSpec::new("idx_deployments_created_at", "deployments", "created_at DESC"),
    IndexSpec::new("idx_deployments_is_active", "deployments", "is_active"),
    IndexSpec::new(
        "idx_deployment_logs_deployment_created",
        "deployment_logs",
        "deployment_id, created_at DESC",
    ),
    IndexSpec::new("idx_deployment_logs_created_at", "deployment_logs", "created_at DESC"),
];

/// Report of one catalog application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub applied: Vec<&'static str>,
    /// Indexes whose table does not exist yet
    pub skipped: Vec<&'static str>,
}

pub struct IndexCatalog;

impl IndexCatalog {
    pub fn indexes() -> &'static [IndexSpec] {
        CATALOG
    }

    /// Create every catalog index whose table exists.
    ///
    /// Missing tables are skipped rather than failing the whole run; any
    /// other error aborts and propagates.
    pub async fn apply(provider: &ConnectionProvider) -> DbResult<IndexReport> {
        let mut handle = provider.acquire().await?;
        let result = Self::apply_on(&mut handle).await;
        handle.release().await;

        let report = result?;
        info!(
            backend = %provider.backend(),
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Index catalog applied"
        );
        Ok(report)
    }

    async fn apply_on(conn: &mut DbConnection) -> DbResult<IndexReport> {
        let mut report = IndexReport::default();
        let mut missing_tables: Vec<&str> = Vec::new();

        for index in CATALOG {
            if missing_tables.contains(&index.table) {
                report.skipped.push(index.name);
                continue;
            }
            match SchemaInspector::fetch_columns(conn, index.table).await {
                Ok(_) => {}
                Err(DbError::SchemaLookupFailed { .. }) => {
                    warn!(table = index.table, index = index.name, "Table missing, index skipped");
                    missing_tables.push(index.table);
                    report.skipped.push(index.name);
                    continue;
                }
                Err(e) => return Err(e),
            }

            conn.execute(&index.create_statement()).await?;
            report.applied.push(index.name);
        }

        Ok(report)
    }
}
