//! Schema-related data models.
//!
//! This module defines the column metadata returned by introspection and the
//! composite key the schema cache is indexed by.

use crate::models::BackendKind;
use serde::{Deserialize, Serialize};

/// One column of a table, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as reported by the backend (e.g., `integer`, `TEXT`)
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Cache key: the same table name on two backends is two distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub backend: BackendKind,
    pub table: String,
}

impl SchemaKey {
    pub fn new(backend: BackendKind, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }
}

impl std::fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.backend, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_key_distinguishes_backends() {
        let mut keys = HashSet::new();
        keys.insert(SchemaKey::new(BackendKind::Embedded, "deployments"));
        keys.insert(SchemaKey::new(BackendKind::NetworkedPool, "deployments"));
        keys.insert(SchemaKey::new(BackendKind::Embedded, "deployments"));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_schema_key_display() {
        let key = SchemaKey::new(BackendKind::NetworkedPool, "deployment_logs");
        assert_eq!(key.to_string(), "networked/deployment_logs");
    }

    #[test]
    fn test_column_descriptor_serialization() {
        let col = ColumnDescriptor::new("id", "integer", false);
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["name"], "id");
        assert_eq!(json["data_type"], "integer");
        assert_eq!(json["nullable"], false);
    }
}
