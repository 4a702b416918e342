//! `pgmig -cmd create` - Write a new migration pair from the templates.

use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use pgmig_migrate::{MigrationPair, MigrationWriter};

use crate::config::Context;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the create command
pub async fn run(context: &Context, name: Option<&str>) -> CliResult<()> {
    let name = name.ok_or_else(|| {
        CliError::Command("Missing migration name for 'create' command (use --name)".to_string())
    })?;

    let pair = create_pair(&context.migrations_dir(), name, Local::now()).await?;

    output::success("Created migration files:");
    output::list_item(&pair.up.display().to_string());
    output::list_item(&pair.down.display().to_string());

    Ok(())
}

/// Write `{timestamp}_{name}.{up,down}.sql` into `dir`.
pub async fn create_pair<Tz>(dir: &Path, name: &str, at: DateTime<Tz>) -> CliResult<MigrationPair>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    Ok(MigrationWriter::new(dir).create(name, at).await?)
}
