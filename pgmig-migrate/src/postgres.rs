//! PostgreSQL backend built on `tokio-postgres`.

use tokio_postgres::{Client, SimpleQueryMessage};
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};
use crate::history::{
    MigrationDriver, NIL_VERSION, VersionState, advisory_lock_key, create_table_sql, quote_ident,
};
use crate::script::StatementExecutor;

/// Render a driver error, preferring the server's own message.
pub fn describe_error(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{} ({}): {}", db.severity(), db.code().code(), db.message()),
        None => err.to_string(),
    }
}

/// Migration driver storing its version row in a PostgreSQL table.
pub struct PostgresDriver {
    client: Client,
    table: String,
    lock_key: i64,
}

impl PostgresDriver {
    /// Create a driver for `database`, keeping versions in `table`.
    pub fn new(client: Client, database: &str, table: impl Into<String>) -> Self {
        let table = table.into();
        let lock_key = advisory_lock_key(database, &table);
        Self {
            client,
            table,
            lock_key,
        }
    }

    /// Give back the underlying client.
    pub fn into_client(self) -> Client {
        self.client
    }
}

#[async_trait::async_trait]
impl MigrationDriver for PostgresDriver {
    async fn initialize(&mut self) -> MigrateResult<()> {
        self.client
            .batch_execute(&create_table_sql(&self.table))
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))
    }

    async fn lock(&mut self) -> MigrateResult<()> {
        debug!(key = self.lock_key, "Acquiring advisory lock");
        self.client
            .execute("SELECT pg_advisory_lock($1)", &[&self.lock_key])
            .await
            .map_err(|e| MigrationError::Lock(describe_error(&e)))?;
        Ok(())
    }

    async fn unlock(&mut self) -> MigrateResult<()> {
        self.client
            .execute("SELECT pg_advisory_unlock($1)", &[&self.lock_key])
            .await
            .map_err(|e| MigrationError::Lock(describe_error(&e)))?;
        Ok(())
    }

    async fn version(&mut self) -> MigrateResult<VersionState> {
        let sql = format!(
            "SELECT version, dirty FROM {} LIMIT 1",
            quote_ident(&self.table)
        );
        let row = self
            .client
            .query_opt(sql.as_str(), &[])
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))?;

        Ok(match row {
            Some(row) => {
                let version: i64 = row
                    .try_get(0)
                    .map_err(|e| MigrationError::database(describe_error(&e)))?;
                let dirty: bool = row
                    .try_get(1)
                    .map_err(|e| MigrationError::database(describe_error(&e)))?;
                VersionState {
                    version: (version != NIL_VERSION).then_some(version),
                    dirty,
                }
            }
            None => VersionState::default(),
        })
    }

    async fn set_version(&mut self, version: Option<i64>, dirty: bool) -> MigrateResult<()> {
        let table = quote_ident(&self.table);
        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))?;

        tx.batch_execute(&format!("TRUNCATE {}", table))
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))?;

        // A failed revert of the first unit still has to be recorded as dirty.
        if version.is_some() || dirty {
            let stored = version.unwrap_or(NIL_VERSION);
            tx.execute(
                format!("INSERT INTO {} (version, dirty) VALUES ($1, $2)", table).as_str(),
                &[&stored, &dirty],
            )
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))
    }

    async fn run(&mut self, sql: &str) -> MigrateResult<()> {
        if sql.trim().is_empty() {
            return Ok(());
        }
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| MigrationError::database(describe_error(&e)))
    }
}

#[async_trait::async_trait]
impl StatementExecutor for Client {
    async fn execute_statement(&mut self, statement: &str) -> Result<u64, String> {
        let messages = self
            .simple_query(statement)
            .await
            .map_err(|e| describe_error(&e))?;

        Ok(messages
            .iter()
            .map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => *rows,
                _ => 0,
            })
            .sum())
    }
}
