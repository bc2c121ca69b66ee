//! Schema introspection module.
//!
//! Lists the columns of a table on whichever backend a connection belongs to.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! backend. Backend-specific implementations live in their own submodules, each
//! providing the same interface.

use crate::db::params::validate_identifier;
use crate::db::pool::DbConnection;
use crate::error::{DbError, DbResult};
use crate::models::ColumnDescriptor;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List a table's columns in declaration order.
    ///
    /// A table with no columns does not exist, which is reported as
    /// `SchemaLookupFailed` rather than an empty list.
    pub async fn fetch_columns(
        conn: &mut DbConnection,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        validate_identifier(table)?;

        let columns = match conn {
            DbConnection::Embedded(c) => sqlite::fetch_columns(c, table).await,
            DbConnection::Networked(c) => postgres::fetch_columns(c, table).await,
        }
        .map_err(|e| DbError::schema_lookup_failed(table, e.to_string()))?;

        if columns.is_empty() {
            return Err(DbError::schema_lookup_failed(table, "table does not exist"));
        }

        debug!(table, backend = %conn.backend(), count = columns.len(), "Introspected columns");
        Ok(columns)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                column_name::text AS name,
                data_type::text AS data_type,
                (is_nullable = 'YES') AS nullable
            FROM information_schema.columns
            WHERE table_schema = current_schema()
            AND table_name = $1
            ORDER BY ordinal_position
            "#;
    }

    pub mod sqlite {
        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT name, type, "notnull"
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#;
    }
}

// =============================================================================
// Backend-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgConnection, Row};

    pub async fn fetch_columns(
        conn: &mut PgConnection,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, sqlx::Error> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(conn)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(ColumnDescriptor::new(
                    row.try_get::<String, _>("name")?,
                    row.try_get::<String, _>("data_type")?,
                    row.try_get::<bool, _>("nullable")?,
                ))
            })
            .collect()
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqliteConnection};

    pub async fn fetch_columns(
        conn: &mut SqliteConnection,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, sqlx::Error> {
        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table)
            .fetch_all(conn)
            .await?;

        rows.iter()
            .map(|row| {
                // Declared type may be empty for untyped columns
                let data_type: Option<String> = row.try_get("type")?;
                let not_null: i64 = row.try_get("notnull")?;
                Ok(ColumnDescriptor::new(
                    row.try_get::<String, _>("name")?,
                    data_type.unwrap_or_default(),
                    not_null == 0,
                ))
            })
            .collect()
    }
}
