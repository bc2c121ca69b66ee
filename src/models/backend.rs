//! Backend identity and connection target models.
//!
//! The backend is selected once at process start and never changes afterwards.

use crate::config::PoolOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The two supported storage engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// In-process SQLite file, one direct connection per acquisition.
    Embedded,
    /// PostgreSQL server reached through a shared connection pool.
    NetworkedPool,
}

impl BackendKind {
    /// Parse the backend from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::NetworkedPool)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::Embedded)
        } else {
            None
        }
    }

    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::NetworkedPool => "networked",
        }
    }

}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Where to connect, resolved from configuration at startup.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Embedded {
        path: PathBuf,
        /// Only the acquisition timeout applies; it becomes the SQLite busy timeout.
        pool: PoolOptions,
    },
    Networked {
        /// Contains credentials - never log, use `masked()`
        url: String,
        pool: PoolOptions,
    },
}

impl BackendConfig {
    /// The backend identity this configuration selects.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Embedded { .. } => BackendKind::Embedded,
            Self::Networked { .. } => BackendKind::NetworkedPool,
        }
    }

    /// Pool options for this backend.
    pub fn pool_options(&self) -> &PoolOptions {
        match self {
            Self::Embedded { pool, .. } | Self::Networked { pool, .. } => pool,
        }
    }

    /// Get a display-safe version of the target (credentials masked).
    pub fn masked(&self) -> String {
        match self {
            Self::Embedded { path, .. } => format!("sqlite:{}", path.display()),
            Self::Networked { url, .. } => mask_password(url),
        }
    }
}

fn mask_password(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@') {
        let scheme_end = connection_string.find("://").map(|p| p + 3).unwrap_or(0);
        if let Some(colon_pos) = connection_string[..at_pos].rfind(':') {
            if colon_pos >= scheme_end {
                let prefix = &connection_string[..colon_pos + 1];
                let suffix = &connection_string[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
    }
    connection_string.to_string()
}
