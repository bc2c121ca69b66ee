//! Workflow Store - maintenance entry point.
//!
//! Applies the index catalog, reports pool health, inspects table columns and
//! runs forced prunes against whichever backend the environment selects.

use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use workflow_store::config::{Command, Config};
use workflow_store::models::{RetentionTarget, RetentionWindow, ScopeValue};
use workflow_store::DataStore;

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays valid JSON
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse the scope value as an integer when it looks like one.
fn scope_value(raw: String) -> ScopeValue {
    match raw.parse::<i64>() {
        Ok(v) => ScopeValue::Integer(v),
        Err(_) => ScopeValue::Text(raw),
    }
}

async fn run(store: &DataStore, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Migrate => {
            let report = store.apply_indexes().await?;
            print_json(&report)?;
        }
        Command::Stats => {
            // Touch the backend so the pool numbers are meaningful
            store.ping().await?;
            print_json(&store.pool_stats().await)?;
        }
        Command::Columns { table, refresh } => {
            let columns = store.columns(&table, !refresh).await?;
            print_json(columns.as_slice())?;
        }
        Command::Prune {
            table,
            scope_column,
            scope_value: raw_scope,
            keep,
            id_column,
            recency_column,
        } => {
            let mut target = RetentionTarget::new(table)?
                .with_id_column(id_column)?
                .with_recency_column(recency_column)?;
            if let (Some(column), Some(raw)) = (scope_column, raw_scope) {
                target = target.with_scope(column, scope_value(raw))?;
            }
            let deleted = store
                .prune_now(&target, RetentionWindow::MaxRows(keep))
                .await?;
            print_json(&serde_json::json!({ "table": target.table, "deleted": deleted }))?;
        }
        Command::Ping => {
            store.ping().await?;
            print_json(&serde_json::json!({ "backend": store.backend(), "status": "ok" }))?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from .env, environment and command line
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let store = DataStore::connect(&config)?;
    info!(
        backend = %store.backend(),
        "Starting workflow-store v{}",
        env!("CARGO_PKG_VERSION")
    );

    let command = config.command.clone().unwrap_or(Command::Stats);
    let result = run(&store, command).await;
    store.close().await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}
