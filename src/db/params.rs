//! Parameter binding and identifier utilities for database queries.
//!
//! Table and column names cannot be bound as parameters, so every identifier
//! that reaches a statement is validated here and then double-quoted.

use crate::error::{DbError, DbResult};
use crate::models::ScopeValue;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Postgres, Sqlite};

/// Longest identifier PostgreSQL keeps without truncation.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start
        || name.len() > MAX_IDENTIFIER_LEN
        || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(DbError::invalid_input(format!(
            "Invalid identifier '{}': use letters, digits and underscores only",
            name
        )));
    }
    Ok(())
}

/// Quote a validated identifier for use in SQL text.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Bind a scope value to a PostgreSQL query.
pub(crate) fn bind_postgres_scope<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q ScopeValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        ScopeValue::Integer(v) => query.bind(*v),
        ScopeValue::Text(v) => query.bind(v.as_str()),
    }
}

/// Bind a scope value to a SQLite query.
pub(crate) fn bind_sqlite_scope<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q ScopeValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        ScopeValue::Integer(v) => query.bind(*v),
        ScopeValue::Text(v) => query.bind(v.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["deployment_logs", "_tmp", "T1", "created_at"] {
            assert!(validate_identifier(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for name in ["", "1abc", "a b", "a-b", "a\"b", "a;b", "ünicode"] {
            assert!(validate_identifier(name).is_err(), "{}", name);
        }
        assert!(validate_identifier(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("deployment_logs"), "\"deployment_logs\"");
    }
}
