//! Command tests against a live PostgreSQL server.
//!
//! Set `PGMIG_TEST_DATABASE_URL` to run them; without it every test returns
//! early. The user needs the CREATEDB privilege for the bootstrap test.

use std::path::Path;

use chrono::Utc;
use pgmig_cli::commands::init::write_default_migration;
use pgmig_cli::commands::migrate::{self, MigrateCommand};
use pgmig_cli::config::{Context, DatabaseConfig, ProjectConfig};
use pgmig_cli::db;
use pgmig_migrate::{Direction, MigrationSource, Migrator, PostgresDriver, VersionState};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_postgres::Client;
use tokio_postgres::config::Host;

/// Context rooted at `root`, connecting with the test URL's settings
fn context(root: &Path, table: &str) -> Option<Context> {
    let url = std::env::var("PGMIG_TEST_DATABASE_URL").ok()?;
    let pg: tokio_postgres::Config = url.parse().expect("invalid PGMIG_TEST_DATABASE_URL");

    let host = match pg.get_hosts().first() {
        Some(Host::Tcp(host)) => host.clone(),
        _ => "localhost".to_string(),
    };
    let database = DatabaseConfig {
        user: pg.get_user().unwrap_or("postgres").to_string(),
        password: pg
            .get_password()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default(),
        host,
        port: pg.get_ports().first().copied().unwrap_or(5432).to_string(),
        database: pg.get_dbname().unwrap_or("postgres").to_string(),
        connect_timeout: None,
    };

    let mut project = ProjectConfig::default();
    project.migrations.table = table.to_string();

    Some(Context {
        database,
        project,
        root: root.to_path_buf(),
    })
}

async fn table_exists(client: &Client, name: &str) -> bool {
    client
        .query_one("SELECT EXISTS (SELECT 1 FROM pg_tables WHERE tablename = $1)", &[&name])
        .await
        .unwrap()
        .get(0)
}

async fn recorded_version(ctx: &Context) -> VersionState {
    let client = db::connect(&ctx.database.pg_config().unwrap()).await.unwrap();
    let driver = PostgresDriver::new(client, &ctx.database.database, ctx.table());
    let mut migrator = Migrator::new(MigrationSource::new(ctx.migrations_dir()), driver);
    migrator.version().await.unwrap()
}

#[tokio::test]
async fn test_bootstrap_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let Some(ctx) = context(dir.path(), "pgmig_it_boot_versions") else {
        return;
    };
    let name = "pgmig_it_bootstrap";

    let admin = db::connect(&ctx.database.admin_pg_config().unwrap())
        .await
        .unwrap();
    admin
        .batch_execute(&format!("DROP DATABASE IF EXISTS {}", name))
        .await
        .unwrap();

    assert!(db::ensure_database(&admin, name).await.unwrap());
    assert!(!db::ensure_database(&admin, name).await.unwrap());

    let migrations = ctx.migrations_dir();
    let first = write_default_migration(&migrations, name, Utc::now())
        .await
        .unwrap();
    assert!(first.is_some());
    let second = write_default_migration(&migrations, name, Utc::now())
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(std::fs::read_dir(&migrations).unwrap().count(), 2);

    admin
        .batch_execute(&format!("DROP DATABASE {}", name))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_named_migration_bypasses_version_table() {
    let dir = TempDir::new().unwrap();
    let table = "pgmig_it_single_versions";
    let Some(ctx) = context(dir.path(), table) else {
        return;
    };

    let client = db::connect(&ctx.database.pg_config().unwrap()).await.unwrap();
    client
        .batch_execute(
            "DROP TABLE IF EXISTS pgmig_it_single_base; \
             DROP TABLE IF EXISTS pgmig_it_single_extra; \
             DROP TABLE IF EXISTS pgmig_it_single_versions",
        )
        .await
        .unwrap();

    let migrations = ctx.migrations_dir();
    std::fs::create_dir_all(&migrations).unwrap();
    let files = [
        ("20230101_000000_base.up.sql", "CREATE TABLE pgmig_it_single_base(id int);"),
        ("20230101_000000_base.down.sql", "DROP TABLE pgmig_it_single_base;"),
        (
            "20230102_000000_extra.up.sql",
            "CREATE TABLE pgmig_it_single_extra(id int);\n\
             INSERT INTO pgmig_it_single_extra VALUES (1);\n\
             INSERT INTO pgmig_it_single_extra VALUES (2);",
        ),
        ("20230102_000000_extra.down.sql", "DROP TABLE pgmig_it_single_extra;"),
    ];
    for (file, sql) in files {
        std::fs::write(migrations.join(file), sql).unwrap();
    }

    migrate::run(&ctx, MigrateCommand::Steps(1)).await.unwrap();
    let before = recorded_version(&ctx).await;
    assert_eq!(before, VersionState::clean(Some(20230101000000)));

    migrate::apply_single(&ctx, "extra", Direction::Up)
        .await
        .unwrap();
    assert!(table_exists(&client, "pgmig_it_single_extra").await);
    let count: i64 = client
        .query_one("SELECT count(*) FROM pgmig_it_single_extra", &[])
        .await
        .unwrap()
        .get(0);
    assert_eq!(count, 2);
    assert_eq!(recorded_version(&ctx).await, before);

    migrate::apply_single(&ctx, "extra", Direction::Down)
        .await
        .unwrap();
    assert!(!table_exists(&client, "pgmig_it_single_extra").await);
    assert_eq!(recorded_version(&ctx).await, before);

    migrate::run(&ctx, MigrateCommand::Down).await.unwrap();
    assert!(!table_exists(&client, "pgmig_it_single_base").await);
    client
        .batch_execute("DROP TABLE IF EXISTS pgmig_it_single_versions")
        .await
        .unwrap();
}
