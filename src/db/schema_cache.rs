//! Process-wide cache of table column lists.
//!
//! Entries are keyed by `(backend, table)` so a table of the same name on the
//! other backend never shares an entry. Entries live until evicted; nothing
//! expires on its own. Concurrent misses for one key may both introspect, and
//! either result may win.

use crate::db::pool::ConnectionProvider;
use crate::db::schema::SchemaInspector;
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, SchemaKey};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Counters describing cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Round trips to the backend, including forced refreshes
    pub introspections: u64,
}

#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<SchemaKey, Arc<Vec<ColumnDescriptor>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    introspections: AtomicU64,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the ordered column list for `table` on the provider's backend.
    ///
    /// With `use_cache` set, a cached entry is returned without touching the
    /// backend. Otherwise (or on a miss) the table is introspected and the
    /// result stored. A failed lookup leaves any existing entry untouched.
    pub async fn columns(
        &self,
        provider: &ConnectionProvider,
        table: &str,
        use_cache: bool,
    ) -> DbResult<Arc<Vec<ColumnDescriptor>>> {
        let key = SchemaKey::new(provider.backend(), table);

        if use_cache {
            if let Some(columns) = self.entries.read().await.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(columns));
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        let columns = Arc::new(self.introspect(provider, table).await?);
        self.entries
            .write()
            .await
            .insert(key.clone(), Arc::clone(&columns));
        debug!(key = %key, count = columns.len(), "Schema cache entry stored");
        Ok(columns)
    }

    async fn introspect(
        &self,
        provider: &ConnectionProvider,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        self.introspections.fetch_add(1, Ordering::Relaxed);
        let mut handle = provider.acquire().await?;
        let result = SchemaInspector::fetch_columns(&mut handle, table).await;
        handle.release().await;
        result
    }

    /// Whether `table` has a column named `column`, using the cache.
    pub async fn has_column(
        &self,
        provider: &ConnectionProvider,
        table: &str,
        column: &str,
    ) -> DbResult<bool> {
        let columns = self.columns(provider, table, true).await?;
        Ok(columns.iter().any(|c| c.name == column))
    }

    /// Evict one table (on every backend) or, with `None`, everything.
    ///
    /// Returns the number of entries removed. Evicting an absent table is a no-op.
    pub async fn evict(&self, table: Option<&str>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        match table {
            Some(table) => entries.retain(|key, _| key.table != table),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        if removed > 0 {
            info!(table = table.unwrap_or("*"), removed, "Schema cache evicted");
        }
        removed
    }

    /// Number of cached entries across all backends.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Snapshot of the counters.
    pub async fn stats(&self) -> SchemaCacheStats {
        SchemaCacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            introspections: self.introspections.load(Ordering::Relaxed),
        }
    }
}
