//! Data store facade.
//!
//! Bundles the connection provider, schema cache and retention pruner that
//! request handlers share for the lifetime of the process.

use crate::config::Config;
use crate::db::{
    ConnectionHandle, ConnectionProvider, IndexCatalog, IndexReport, PoolStats, RetentionPruner,
    SchemaCache, SchemaCacheStats,
};
use crate::error::{DbError, DbResult};
use crate::models::{
    BackendKind, ColumnDescriptor, PruneOutcome, RetentionTarget, RetentionWindow, ScopeValue,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug)]
pub struct DataStore {
    provider: Arc<ConnectionProvider>,
    schema_cache: SchemaCache,
    pruner: RetentionPruner,
    log_retention: u32,
}

impl DataStore {
    /// Build the store from configuration. No connection is opened yet.
    pub fn connect(config: &Config) -> DbResult<Self> {
        config.validate().map_err(DbError::invalid_input)?;
        let backend = config.backend_config().map_err(DbError::invalid_input)?;
        let pruner = RetentionPruner::new(config.prune_probability)?;

        info!(
            backend = %backend.kind(),
            prune_probability = config.prune_probability,
            log_retention = config.log_retention,
            "Data store configured"
        );
        Ok(Self::from_parts(
            ConnectionProvider::new(backend),
            pruner,
            config.log_retention,
        ))
    }

    /// Assemble a store from prebuilt parts (e.g. a seeded pruner).
    pub fn from_parts(
        provider: ConnectionProvider,
        pruner: RetentionPruner,
        log_retention: u32,
    ) -> Self {
        Self {
            provider: Arc::new(provider),
            schema_cache: SchemaCache::new(),
            pruner,
            log_retention,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.provider.backend()
    }

    pub fn provider(&self) -> &Arc<ConnectionProvider> {
        &self.provider
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schema_cache
    }

    pub async fn acquire(&self) -> DbResult<ConnectionHandle> {
        self.provider.acquire().await
    }

    /// Column metadata for `table`, served from the cache when `use_cache` is set.
    pub async fn columns(
        &self,
        table: &str,
        use_cache: bool,
    ) -> DbResult<Arc<Vec<ColumnDescriptor>>> {
        self.schema_cache
            .columns(&self.provider, table, use_cache)
            .await
    }

    pub async fn has_column(&self, table: &str, column: &str) -> DbResult<bool> {
        self.schema_cache
            .has_column(&self.provider, table, column)
            .await
    }

    /// Call after any schema migration touching `table` (or all tables with `None`).
    pub async fn evict(&self, table: Option<&str>) -> usize {
        self.schema_cache.evict(table).await
    }

    pub async fn schema_cache_stats(&self) -> SchemaCacheStats {
        self.schema_cache.stats().await
    }

    /// Maybe prune `target` after a successful write to it.
    pub async fn after_write(
        &self,
        target: &RetentionTarget,
        window: RetentionWindow,
    ) -> PruneOutcome {
        self.pruner.after_write(&self.provider, target, window).await
    }

    /// Maybe prune one deployment's logs down to the configured retention.
    pub async fn after_log_write(&self, deployment_id: impl Into<ScopeValue>) -> PruneOutcome {
        let target = RetentionTarget::deployment_logs(deployment_id);
        self.after_write(&target, RetentionWindow::MaxRows(self.log_retention))
            .await
    }

    /// Like `after_write` without waiting; `None` when the coin flip skipped.
    pub fn schedule_prune(
        &self,
        target: RetentionTarget,
        window: RetentionWindow,
    ) -> Option<JoinHandle<PruneOutcome>> {
        self.pruner
            .spawn_after_write(Arc::clone(&self.provider), target, window)
    }

    /// Prune unconditionally. Errors propagate.
    pub async fn prune_now(
        &self,
        target: &RetentionTarget,
        window: RetentionWindow,
    ) -> DbResult<u64> {
        RetentionPruner::prune_now(&self.provider, target, window).await
    }

    pub async fn pool_stats(&self) -> PoolStats {
        self.provider.stats().await
    }

    pub async fn ping(&self) -> DbResult<()> {
        self.provider.ping().await
    }

    /// Apply the index catalog, then drop every cached schema.
    pub async fn apply_indexes(&self) -> DbResult<IndexReport> {
        let report = IndexCatalog::apply(&self.provider).await?;
        self.schema_cache.evict(None).await;
        Ok(report)
    }

    pub async fn close(&self) {
        self.provider.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_connect_rejects_invalid_config() {
        let config = Config {
            prune_probability: 2.0,
            ..Config::default_config()
        };
        assert!(matches!(
            DataStore::connect(&config),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_connect_selects_backend() {
        let config = Config {
            sqlite_path: PathBuf::from("unused.db"),
            ..Config::default_config()
        };
        let store = DataStore::connect(&config).unwrap();
        assert_eq!(store.backend(), BackendKind::Embedded);

        let config = Config {
            postgres_url: Some("postgres://u:p@localhost/db".to_string()),
            ..Config::default_config()
        };
        let store = DataStore::connect(&config).unwrap();
        assert_eq!(store.backend(), BackendKind::NetworkedPool);
    }
}
