//! Probabilistic retention pruning for log-like tables.
//!
//! Each write flips a weighted coin. Most writes pay nothing; the rare one that
//! wins runs a bounded delete that walks the recency index from the newest row
//! and removes everything past the window. Over time the table stays close to
//! its window without any write paying for a full scan.

use crate::db::params::{bind_postgres_scope, bind_sqlite_scope, quote_ident};
use crate::db::pool::{ConnectionProvider, DbConnection};
use crate::error::{DbError, DbResult};
use crate::models::{BackendKind, PruneDecision, PruneOutcome, RetentionTarget, RetentionWindow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct RetentionPruner {
    probability: f64,
    rng: Mutex<StdRng>,
}

impl RetentionPruner {
    /// Create a pruner that triggers on `probability` of writes.
    pub fn new(probability: f64) -> DbResult<Self> {
        Self::build(probability, StdRng::from_entropy())
    }

    /// Create a pruner with a fixed seed, for reproducible decision sequences.
    pub fn with_seed(probability: f64, seed: u64) -> DbResult<Self> {
        Self::build(probability, StdRng::seed_from_u64(seed))
    }

    fn build(probability: f64, rng: StdRng) -> DbResult<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(DbError::invalid_input(format!(
                "Prune probability must be between 0 and 1, got {}",
                probability
            )));
        }
        Ok(Self {
            probability,
            rng: Mutex::new(rng),
        })
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Draw one independent decision.
    pub fn decide(&self) -> PruneDecision {
        let hit = match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.probability),
            // A poisoned RNG is still a valid RNG
            Err(poisoned) => poisoned.into_inner().gen_bool(self.probability),
        };
        if hit {
            PruneDecision::Prune
        } else {
            PruneDecision::Skip
        }
    }

    /// Call after a successful write to `target`'s table.
    ///
    /// Never fails: a prune error is logged and reported as `Failed`.
    pub async fn after_write(
        &self,
        provider: &ConnectionProvider,
        target: &RetentionTarget,
        window: RetentionWindow,
    ) -> PruneOutcome {
        if self.decide() == PruneDecision::Skip {
            debug!(table = %target.table, "Prune skipped");
            return PruneOutcome::Skipped;
        }
        run_logged(provider, target, window).await
    }

    /// Like `after_write`, but runs the prune on a background task.
    ///
    /// The decision is drawn before spawning, so skipped writes spawn nothing
    /// and get `None`.
    pub fn spawn_after_write(
        &self,
        provider: Arc<ConnectionProvider>,
        target: RetentionTarget,
        window: RetentionWindow,
    ) -> Option<JoinHandle<PruneOutcome>> {
        if self.decide() == PruneDecision::Skip {
            debug!(table = %target.table, "Prune skipped");
            return None;
        }
        Some(tokio::spawn(async move {
            run_logged(&provider, &target, window).await
        }))
    }

    /// Prune unconditionally, returning the number of rows deleted.
    pub async fn prune_now(
        provider: &ConnectionProvider,
        target: &RetentionTarget,
        window: RetentionWindow,
    ) -> DbResult<u64> {
        let fail = |e: DbError| DbError::prune_failed(&target.table, e.to_string());

        let mut handle = provider.acquire().await.map_err(fail)?;
        let result = delete_outside_window(&mut handle, target, window).await;
        handle.release().await;
        result.map_err(fail)
    }
}

async fn run_logged(
    provider: &ConnectionProvider,
    target: &RetentionTarget,
    window: RetentionWindow,
) -> PruneOutcome {
    match RetentionPruner::prune_now(provider, target, window).await {
        Ok(deleted) => {
            info!(
                table = %target.table,
                scope = ?target.scope.as_ref().map(|s| s.value.to_string()),
                window = %window,
                deleted,
                "Prune completed"
            );
            PruneOutcome::Pruned { deleted }
        }
        Err(e) => {
            warn!(table = %target.table, error = %e, "Prune failed, ignoring");
            PruneOutcome::Failed
        }
    }
}

async fn delete_outside_window(
    conn: &mut DbConnection,
    target: &RetentionTarget,
    window: RetentionWindow,
) -> DbResult<u64> {
    let sql = build_delete(conn.backend(), target, window);
    debug!(sql = %sql, "Running prune");

    let scope = target.scope.as_ref().map(|s| &s.value);
    let affected = match conn {
        DbConnection::Embedded(c) => {
            let mut query = sqlx::query(&sql);
            if let Some(value) = scope {
                query = bind_sqlite_scope(query, value);
            }
            query = match window {
                RetentionWindow::MaxRows(keep) => query.bind(i64::from(keep)),
                RetentionWindow::MaxAge(age) => query.bind(format!("-{} seconds", age.as_secs())),
            };
            query.execute(&mut *c).await?.rows_affected()
        }
        DbConnection::Networked(c) => {
            let mut query = sqlx::query(&sql);
            if let Some(value) = scope {
                query = bind_postgres_scope(query, value);
            }
            query = match window {
                RetentionWindow::MaxRows(keep) => query.bind(i64::from(keep)),
                RetentionWindow::MaxAge(age) => query.bind(age.as_secs_f64()),
            };
            query.execute(&mut **c).await?.rows_affected()
        }
    };
    Ok(affected)
}

/// Build the delete statement for a window.
///
/// Row windows rank by recency through an `OFFSET` subquery so the index
/// is walked once from the newest row; a `NOT IN (... LIMIT K)` form would
/// compare every row against the kept set.
fn build_delete(backend: BackendKind, target: &RetentionTarget, window: RetentionWindow) -> String {
    let placeholder = |n: usize| match backend {
        BackendKind::Embedded => format!("?{}", n),
        BackendKind::NetworkedPool => format!("${}", n),
    };

    let table = quote_ident(&target.table);
    let mut next = 1;
    let scope_filter = target.scope.as_ref().map(|scope| {
        let clause = format!("{} = {}", quote_ident(&scope.column), placeholder(next));
        next += 1;
        clause
    });
    let window_param = placeholder(next);

    match window {
        RetentionWindow::MaxRows(_) => {
            let id = quote_ident(&target.id_column);
            let where_clause = scope_filter
                .map(|clause| format!(" WHERE {}", clause))
                .unwrap_or_default();
            // SQLite requires a LIMIT before OFFSET; -1 means unbounded
            let limit = match backend {
                BackendKind::Embedded => "LIMIT -1 ",
                BackendKind::NetworkedPool => "",
            };
            format!(
                "DELETE FROM {table} WHERE {id} IN (SELECT {id} FROM {table}{where_clause} \
                 ORDER BY {recency} DESC, {tie} DESC {limit}OFFSET {window_param})",
                recency = quote_ident(&target.recency_column),
                tie = quote_ident(&target.tie_break_column),
            )
        }
        RetentionWindow::MaxAge(_) => {
            let recency = quote_ident(&target.recency_column);
            // SQLite stores timestamps as text in more than one layout; compare as day numbers
            let age_clause = match backend {
                BackendKind::Embedded => {
                    format!("julianday({}) < julianday('now', {})", recency, window_param)
                }
                BackendKind::NetworkedPool => {
                    format!("{} < now() - make_interval(secs => {})", recency, window_param)
                }
            };
            match scope_filter {
                Some(clause) => format!("DELETE FROM {table} WHERE {clause} AND {age_clause}"),
                None => format!("DELETE FROM {table} WHERE {age_clause}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_out_of_range_probability() {
        assert!(RetentionPruner::new(-0.1).is_err());
        assert!(RetentionPruner::new(1.5).is_err());
        assert!(RetentionPruner::new(f64::NAN).is_err());
        assert!(RetentionPruner::new(0.0).is_ok());
        assert!(RetentionPruner::new(1.0).is_ok());
    }

    #[test]
    fn test_extreme_probabilities() {
        let never = RetentionPruner::with_seed(0.0, 1).unwrap();
        let always = RetentionPruner::with_seed(1.0, 1).unwrap();
        for _ in 0..1000 {
            assert_eq!(never.decide(), PruneDecision::Skip);
            assert_eq!(always.decide(), PruneDecision::Prune);
        }
    }

    #[test]
    fn test_seeded_decisions_are_reproducible() {
        let a = RetentionPruner::with_seed(0.5, 42).unwrap();
        let b = RetentionPruner::with_seed(0.5, 42).unwrap();
        let first: Vec<_> = (0..64).map(|_| a.decide()).collect();
        let second: Vec<_> = (0..64).map(|_| b.decide()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_row_window_sqlite_sql() {
        let target = RetentionTarget::deployment_logs(7);
        let sql = build_delete(BackendKind::Embedded, &target, RetentionWindow::MaxRows(50));
        assert_eq!(
            sql,
            "DELETE FROM \"deployment_logs\" WHERE \"id\" IN (SELECT \"id\" FROM \"deployment_logs\" \
             WHERE \"deployment_id\" = ?1 ORDER BY \"created_at\" DESC, \"id\" DESC LIMIT -1 OFFSET ?2)"
        );
        assert!(!sql.contains("NOT IN"));
    }

    #[test]
    fn test_row_window_postgres_sql_without_scope() {
        let target = RetentionTarget::new("logs").unwrap();
        let sql = build_delete(BackendKind::NetworkedPool, &target, RetentionWindow::MaxRows(10));
        assert!(sql.ends_with("ORDER BY \"created_at\" DESC, \"id\" DESC OFFSET $1)"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_age_window_sql() {
        let target = RetentionTarget::deployment_logs("d");
        let window = RetentionWindow::MaxAge(Duration::from_secs(3600));

        let sqlite = build_delete(BackendKind::Embedded, &target, window);
        assert!(sqlite.contains(
            "\"deployment_id\" = ?1 AND julianday(\"created_at\") < julianday('now', ?2)"
        ));

        let postgres = build_delete(BackendKind::NetworkedPool, &target, window);
        assert!(postgres.contains("\"created_at\" < now() - make_interval(secs => $2)"));
    }
}
