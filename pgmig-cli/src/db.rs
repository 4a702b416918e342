//! Database connection helpers.

use pgmig_migrate::{describe_error, quote_ident};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::error::{CliError, CliResult};

/// Connect and spawn the connection task on the current runtime.
///
/// The task ends when the returned client is dropped.
pub async fn connect(config: &tokio_postgres::Config) -> CliResult<Client> {
    debug!(
        host = ?config.get_hosts(),
        dbname = ?config.get_dbname(),
        "Connecting to PostgreSQL"
    );

    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| CliError::Database(format!("Failed to connect: {}", describe_error(&e))))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!(error = %e, "Connection error");
        }
    });

    Ok(client)
}

/// SQL creating database `name`.
pub fn create_database_sql(name: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(name))
}

/// Create database `name` unless it already exists.
///
/// Returns `true` when the database was created.
pub async fn ensure_database(client: &Client, name: &str) -> CliResult<bool> {
    let exists = client
        .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&name])
        .await
        .map_err(|e| CliError::Database(describe_error(&e)))?
        .is_some();

    if exists {
        debug!(database = %name, "Database already exists");
        return Ok(false);
    }

    client
        .batch_execute(&create_database_sql(name))
        .await
        .map_err(|e| {
            CliError::Database(format!(
                "Failed to create database '{}': {}",
                name,
                describe_error(&e)
            ))
        })?;

    info!(database = %name, "Created database");
    Ok(true)
}
