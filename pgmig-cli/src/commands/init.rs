//! `pgmig -cmd init` - Create the database, apply migrations and seed.

use std::path::Path;

use chrono::{DateTime, Local, TimeZone};
use pgmig_migrate::{INIT_DOWN_SQL, INIT_UP_SQL, MigrationPair, MigrationSource, MigrationWriter};

use crate::commands::migrate;
use crate::commands::seed::{self, SeedOptions};
use crate::config::Context;
use crate::db;
use crate::error::CliResult;
use crate::output;

/// Run the init command
pub async fn run(context: &Context, seed_options: &SeedOptions) -> CliResult<()> {
    output::header("Initialize Database");
    output::kv("Database", &context.database.redacted_url());
    output::kv("Migrations", &context.migrations_dir().display().to_string());
    output::newline();

    output::step(1, 4, "Ensuring database exists...");
    {
        let client = db::connect(&context.database.admin_pg_config()?).await?;
        let created = db::ensure_database(&client, &context.database.database).await?;
        if created {
            output::list_item(&format!("Created database '{}'", context.database.database));
        }
    }
    output::success("Database created if not exists.");

    output::step(2, 4, "Checking migrations directory...");
    let default_pair = write_default_migration(
        &context.migrations_dir(),
        &context.database.database,
        Local::now(),
    )
    .await?;
    if let Some(pair) = default_pair {
        output::success("Auto-created initial migration files:");
        output::list_item(&pair.up.display().to_string());
        output::list_item(&pair.down.display().to_string());
    }

    output::step(3, 4, "Applying migrations...");
    let result = migrate::apply_pending(context).await?;
    output::success(&format!("Migration applied. {}", result.summary()));

    output::step(4, 4, "Seeding...");
    seed::run(context, seed_options).await?;

    output::newline();
    output::success("Database initialized.");
    Ok(())
}

/// Write the default `init_{db}_db` pair when `dir` is missing or has no entries.
pub async fn write_default_migration<Tz>(
    dir: &Path,
    database: &str,
    at: DateTime<Tz>,
) -> CliResult<Option<MigrationPair>>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if !MigrationSource::new(dir).is_empty().await? {
        return Ok(None);
    }

    let name = format!("init_{}_db", database);
    let pair = MigrationWriter::new(dir)
        .write_pair(&name, INIT_UP_SQL, INIT_DOWN_SQL, at)
        .await?;
    Ok(Some(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_migration_written_for_missing_dir() {
        let dir = TempDir::new().unwrap();
        let migrations = dir.path().join("database").join("migrations");

        let pair = write_default_migration(&migrations, "appdb", Utc::now())
            .await
            .unwrap()
            .unwrap();

        let up_name = pair.up.file_name().unwrap().to_str().unwrap().to_string();
        assert!(up_name.ends_with("_init_appdb_db.up.sql"));
        assert_eq!(std::fs::read_to_string(&pair.up).unwrap(), INIT_UP_SQL);
        assert_eq!(std::fs::read_to_string(&pair.down).unwrap(), INIT_DOWN_SQL);

        let units = MigrationSource::new(&migrations).load().await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "init_appdb_db");
    }

    #[tokio::test]
    async fn test_default_migration_skipped_when_dir_has_entries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README"), "hand-written migrations").unwrap();

        let pair = write_default_migration(dir.path(), "appdb", Utc::now())
            .await
            .unwrap();
        assert!(pair.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
