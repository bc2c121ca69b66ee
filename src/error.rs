//! Error types for the workflow store.
//!
//! One `thiserror` enum covers the whole crate.
//! Connection and schema errors propagate to the caller unchanged; prune errors
//! are produced internally and swallowed by the pruner.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection pool exhausted: no connection became free within {timeout_secs}s")]
    PoolExhausted { timeout_secs: u64 },

    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String, suggestion: String },

    #[error("Schema lookup failed for table '{table}': {message}")]
    SchemaLookupFailed { table: String, message: String },

    #[error("Prune failed for table '{table}': {message}")]
    PruneFailed { table: String, message: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a pool exhausted error.
    pub fn pool_exhausted(timeout_secs: u64) -> Self {
        Self::PoolExhausted { timeout_secs }
    }

    /// Create a backend unavailable error with a helpful suggestion.
    pub fn backend_unavailable(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema lookup error.
    pub fn schema_lookup_failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaLookupFailed {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a prune error.
    pub fn prune_failed(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PruneFailed {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::BackendUnavailable { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::PoolExhausted { .. } => {
                Some("Retry the request or raise the pool max_size / acquire timeout")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::BackendUnavailable { .. }
        )
    }
}

/// Suggestion for a backend-reported error, keyed on SQLSTATE where available.
fn database_suggestion(code: Option<&str>, message: &str) -> &'static str {
    match code {
        Some("42P01") => "The table does not exist in the current schema",
        Some("42703") => "Refresh the schema cache; a column may have been renamed or dropped",
        Some("40P01") | Some("55P03") => "Lock contention; retry the write",
        Some(c) if c.starts_with("08") => "The server dropped the connection; retry",
        _ if message.contains("no such table") => "The table does not exist in the database file",
        _ if message.contains("database is locked") => {
            "Another writer held the file longer than the busy timeout"
        }
        _ => "Check the statement and the tables it references",
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let suggestion = database_suggestion(code.as_deref(), db_err.message());
                DbError::database(db_err.message(), code, suggestion)
            }
            // The configured timeout is not known here; the provider builds
            // this error itself when it can.
            sqlx::Error::PoolTimedOut => DbError::pool_exhausted(0),
            sqlx::Error::PoolClosed => DbError::backend_unavailable(
                "Connection pool has been closed",
                "Reset the provider to build a fresh pool",
            ),
            sqlx::Error::Configuration(e) => DbError::backend_unavailable(
                format!("Invalid connection settings: {}", e),
                "Check POSTGRES_DB_URL or SQLITE_DB_PATH",
            ),
            sqlx::Error::Io(e) => DbError::backend_unavailable(
                format!("I/O failure talking to the backend: {}", e),
                "Check that the server is reachable or the file is accessible",
            ),
            sqlx::Error::Tls(e) => DbError::backend_unavailable(
                format!("TLS handshake failed: {}", e),
                "Build with tls-native or tls-rustls and check sslmode",
            ),
            sqlx::Error::Protocol(e) => DbError::backend_unavailable(
                format!("Unexpected reply from the backend: {}", e),
                "Check that the URL points at a PostgreSQL server",
            ),
            sqlx::Error::RowNotFound => DbError::internal("Expected a row but none was returned"),
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::backend_unavailable("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Backend unavailable"));
    }

    #[test]
    fn test_pool_exhausted_display_includes_timeout() {
        let err = DbError::pool_exhausted(5);
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert!(DbError::schema_lookup_failed("t", "boom").suggestion().is_none());
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::pool_exhausted(5).is_retryable());
        assert!(DbError::backend_unavailable("err", "sugg").is_retryable());
        assert!(!DbError::schema_lookup_failed("users", "missing").is_retryable());
        assert!(!DbError::prune_failed("logs", "locked").is_retryable());
    }

    #[test]
    fn test_sqlx_pool_timeout_maps_to_pool_exhausted() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted { .. }));
    }

    #[test]
    fn test_sqlx_pool_closed_maps_to_backend_unavailable() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::BackendUnavailable { .. }));
    }

    #[test]
    fn test_database_suggestion_by_sqlstate() {
        assert!(database_suggestion(Some("42P01"), "").contains("does not exist"));
        assert!(database_suggestion(None, "no such table: logs").contains("database file"));
        assert!(database_suggestion(Some("08006"), "").contains("retry"));
    }

    #[test]
    fn test_sqlx_io_maps_to_backend_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: DbError = sqlx::Error::Io(io).into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("refused"));
    }
}
