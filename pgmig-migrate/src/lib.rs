//! # pgmig-migrate
//!
//! Migration engine for pgmig.
//!
//! This crate provides functionality for:
//! - Reading timestamp-prefixed `.up.sql` / `.down.sql` pairs from a directory
//! - Writing new migration pairs from templates
//! - Tracking the schema version in a single-row bookkeeping table
//! - Applying, reverting and stepping through migrations under a lock
//! - Running SQL scripts statement by statement (seeds, one-off migrations)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ MigrationSource │────▶│   Migrator   │────▶│ MigrationDriver  │
//! └─────────────────┘     └──────────────┘     └──────────────────┘
//!                                                       │
//!                                                       ▼
//!                                              ┌──────────────────┐
//!                                              │ schema_migrations│
//!                                              └──────────────────┘
//! ```
//!
//! A migration that fails part-way leaves the recorded version marked
//! dirty. Dirty state blocks further runs until it is cleared with
//! [`Migrator::force`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgmig_migrate::{MigrationSource, Migrator, PostgresDriver};
//!
//! async fn run(client: tokio_postgres::Client) -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = PostgresDriver::new(client, "app", "schema_migrations");
//!     let mut migrator = Migrator::new(MigrationSource::new("database/migrations"), driver);
//!
//!     match migrator.up().await {
//!         Ok(result) => println!("{}", result.summary()),
//!         Err(e) if e.is_no_change() => println!("Nothing to do"),
//!         Err(e) => return Err(e.into()),
//!     }
//!
//!     println!("Current version: {}", migrator.version().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Versions
//!
//! A `YYYYMMDD_HHMMSS_` prefix folds into one 14-digit version, so
//! `20231215_120000_create_users` is version `20231215120000`. Plain
//! numeric prefixes (`1_create_users`) are used as they are.
//!
//! Tables written by tools that read only the leading digits hold the bare
//! date (`20231215`). Such a version is accepted when exactly one unit
//! carries that date and is rewritten in full on the next change. With
//! several units on the same day it is reported as unknown, and
//! [`Migrator::force`] has to set the full version first.
//!
//! ## Migration Files
//!
//! ```text
//! database/migrations/
//! ├── 20231215_120000_create_users.up.sql
//! ├── 20231215_120000_create_users.down.sql
//! ├── 20231216_090000_add_posts.up.sql
//! └── 20231216_090000_add_posts.down.sql
//! ```

pub mod engine;
pub mod error;
pub mod file;
pub mod history;
pub mod postgres;
pub mod script;

// Re-exports
pub use engine::{MigrationResult, Migrator};
pub use error::{MigrateResult, MigrationError};
pub use file::{
    DOWN_TEMPLATE, Direction, INIT_DOWN_SQL, INIT_UP_SQL, Migration, MigrationPair,
    MigrationSource, MigrationWriter, ParsedFileName, TIMESTAMP_FORMAT, UP_TEMPLATE,
    parse_file_name,
};
pub use history::{DEFAULT_TABLE, MigrationDriver, NIL_VERSION, VersionState, quote_ident};
pub use postgres::{PostgresDriver, describe_error};
pub use script::{ScriptReport, StatementExecutor, run_script, split_statements};
