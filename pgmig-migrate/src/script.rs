//! Statement-by-statement execution of SQL scripts.
//!
//! Used for seed files and for applying a single named migration outside
//! version tracking. Scripts are split on every `;`, so semicolons inside
//! string literals, comments or `$$` bodies also split. Statements run one
//! at a time without a surrounding transaction: when one fails, the ones
//! before it stay committed and the rest are skipped.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{MigrateResult, MigrationError};

/// Split a script into trimmed, non-empty statements.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Something that can execute one SQL statement.
#[async_trait::async_trait]
pub trait StatementExecutor: Send {
    /// Execute a statement, returning the number of rows affected.
    async fn execute_statement(&mut self, statement: &str) -> Result<u64, String>;
}

/// Outcome of a script run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptReport {
    /// Statements executed successfully.
    pub statements: usize,
    /// Sum of rows affected.
    pub rows_affected: u64,
    /// Wall time in milliseconds.
    pub duration_ms: i64,
}

/// Run every statement of `sql` in order, stopping at the first failure.
pub async fn run_script<E>(executor: &mut E, sql: &str) -> MigrateResult<ScriptReport>
where
    E: StatementExecutor + ?Sized,
{
    let start = Instant::now();
    let statements = split_statements(sql);
    let total = statements.len();
    let mut report = ScriptReport::default();

    for (index, statement) in statements.into_iter().enumerate() {
        info!(statement = index + 1, total, "Executing statement");
        debug!(sql = %statement, "Statement text");

        let rows = executor
            .execute_statement(statement)
            .await
            .map_err(|message| MigrationError::statement(statement, message))?;

        report.statements += 1;
        report.rows_affected += rows;
    }

    report.duration_ms = start.elapsed().as_millis() as i64;
    Ok(report)
}
