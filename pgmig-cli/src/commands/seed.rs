//! Database seeding from SQL files.
//!
//! The seed file is `database/seeds/<env>.sql` unless `--seed-file` names
//! another one. Statements run one at a time without a transaction, so a
//! failure leaves earlier statements committed.

use std::path::{Path, PathBuf};

use pgmig_migrate::{ScriptReport, StatementExecutor, run_script};
use tracing::info;

use crate::config::Context;
use crate::db;
use crate::error::{CliError, CliResult};
use crate::output;

/// Seed selection from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOptions {
    /// Environment name (dev, test, prod, ...)
    pub env: String,
    /// Explicit seed file, overriding the environment default
    pub seed_file: Option<PathBuf>,
}

/// Seed runner for one resolved file
#[derive(Debug, Clone)]
pub struct SeedRunner {
    seed_path: PathBuf,
}

impl SeedRunner {
    /// Resolve the seed file for `options`
    pub fn resolve(context: &Context, options: &SeedOptions) -> Self {
        let seed_path = match &options.seed_file {
            Some(path) => context.root.join(path),
            None => context.seeds_dir().join(format!("{}.sql", options.env)),
        };
        Self { seed_path }
    }

    /// Path of the seed file
    pub fn seed_path(&self) -> &Path {
        &self.seed_path
    }

    /// Read the seed file
    pub async fn read(&self) -> CliResult<String> {
        tokio::fs::read_to_string(&self.seed_path)
            .await
            .map_err(|e| {
                CliError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to read seed file {}: {}", self.seed_path.display(), e),
                ))
            })
    }

    /// Run the seed SQL through `executor`
    pub async fn execute<E>(&self, executor: &mut E, sql: &str) -> CliResult<ScriptReport>
    where
        E: StatementExecutor + ?Sized,
    {
        info!(file = %self.seed_path.display(), "Running seed file");
        Ok(run_script(executor, sql).await?)
    }
}

/// Run the seed command
pub async fn run(context: &Context, options: &SeedOptions) -> CliResult<ScriptReport> {
    let runner = SeedRunner::resolve(context, options);

    // A missing file fails before any connection is made.
    let sql = runner.read().await?;

    let mut client = db::connect(&context.database.pg_config()?).await?;
    let report = runner.execute(&mut client, &sql).await?;

    output::success("Seed data inserted.");
    output::kv("File", &runner.seed_path().display().to_string());
    output::kv("Statements", &report.statements.to_string());
    output::kv("Rows affected", &report.rows_affected.to_string());

    Ok(report)
}
