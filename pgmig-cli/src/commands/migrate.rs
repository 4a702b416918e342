//! `pgmig -cmd up|down|steps|force|version` - Versioned migrations.

use pgmig_migrate::{
    Direction, MigrateResult, MigrationResult, MigrationSource, Migrator, PostgresDriver,
    run_script,
};
use tracing::info;

use crate::config::Context;
use crate::db;
use crate::error::CliResult;
use crate::output;

/// A migration runner operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateCommand {
    /// Apply all pending migrations
    Up,
    /// Revert one migration
    Down,
    /// Apply (positive) or revert (negative) a number of migrations
    Steps(i64),
    /// Record a version without running SQL
    Force(i64),
    /// Print the current version
    Version,
}

impl MigrateCommand {
    /// Command name for messages
    pub fn name(self) -> &'static str {
        match self {
            MigrateCommand::Up => "up",
            MigrateCommand::Down => "down",
            MigrateCommand::Steps(_) => "steps",
            MigrateCommand::Force(_) => "force",
            MigrateCommand::Version => "version",
        }
    }
}

/// Run a migration command
pub async fn run(context: &Context, command: MigrateCommand) -> CliResult<()> {
    let mut migrator = open(context).await?;

    let outcome = match command {
        MigrateCommand::Up => migrator.up().await,
        MigrateCommand::Down => migrator.down().await,
        MigrateCommand::Steps(n) => migrator.steps(n).await,
        MigrateCommand::Force(version) => migrator
            .force(version)
            .await
            .map(|()| MigrationResult::default()),
        MigrateCommand::Version => {
            let state = migrator.version().await?;
            println!("Current version: {}", state);
            return Ok(());
        }
    };

    report(command.name(), outcome)
}

/// Apply every pending migration, treating "no change" as success
pub async fn apply_pending(context: &Context) -> CliResult<MigrationResult> {
    let mut migrator = open(context).await?;
    match migrator.up().await {
        Ok(result) => Ok(result),
        Err(e) if e.is_no_change() => Ok(MigrationResult::default()),
        Err(e) => Err(e.into()),
    }
}

/// Run the single file `*_{name}.{up,down}.sql` statement by statement.
///
/// The version table is not touched.
pub async fn apply_single(context: &Context, name: &str, direction: Direction) -> CliResult<()> {
    let source = MigrationSource::new(context.migrations_dir());

    // Resolve and read before connecting so a miss writes nothing.
    let path = source.find_by_name(name, direction).await?;
    let sql = tokio::fs::read_to_string(&path).await?;

    info!(file = %path.display(), "Running single migration outside version tracking");

    let mut client = db::connect(&context.database.pg_config()?).await?;
    let script = run_script(&mut client, &sql).await?;

    output::success(&format!(
        "Applied migration: {}{}",
        name,
        direction.suffix()
    ));
    output::kv("Statements", &script.statements.to_string());

    Ok(())
}

async fn open(context: &Context) -> CliResult<Migrator<PostgresDriver>> {
    let client = db::connect(&context.database.pg_config()?).await?;
    let driver = PostgresDriver::new(client, &context.database.database, context.table());
    Ok(Migrator::new(
        MigrationSource::new(context.migrations_dir()),
        driver,
    ))
}

fn report(command: &str, outcome: MigrateResult<MigrationResult>) -> CliResult<()> {
    match outcome {
        Ok(result) => {
            for version in &result.applied {
                output::list_item(&format!("applied {}", version));
            }
            for version in &result.reverted {
                output::list_item(&format!("reverted {}", version));
            }
            if result.has_changes() {
                output::info(&result.summary());
            }
        }
        Err(e) if e.is_no_change() => output::info("No change"),
        Err(e) => return Err(e.into()),
    }

    output::success(&format!("Migration command '{}' completed.", command));
    Ok(())
}
