//! Schema version tracking.
//!
//! The database keeps a single row recording the last applied version and
//! whether the migration that produced it finished cleanly. A missing row
//! means nothing has been applied.

use std::fmt;

use crate::error::MigrateResult;

/// Default name of the bookkeeping table.
pub const DEFAULT_TABLE: &str = "schema_migrations";

/// Stored value for "no version, but dirty".
pub const NIL_VERSION: i64 = -1;

/// Version state recorded in the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionState {
    /// Last applied version, if any.
    pub version: Option<i64>,
    /// Whether the last migration failed part-way through.
    pub dirty: bool,
}

impl VersionState {
    /// A clean state at `version`.
    pub fn clean(version: Option<i64>) -> Self {
        Self {
            version,
            dirty: false,
        }
    }
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (dirty: {})",
            self.version.unwrap_or(0),
            self.dirty
        )
    }
}

/// Storage and execution backend for the migrator.
#[async_trait::async_trait]
pub trait MigrationDriver: Send {
    /// Create the bookkeeping table if needed.
    async fn initialize(&mut self) -> MigrateResult<()>;

    /// Acquire an exclusive migration lock.
    async fn lock(&mut self) -> MigrateResult<()>;

    /// Release the migration lock.
    async fn unlock(&mut self) -> MigrateResult<()>;

    /// Read the recorded version state.
    async fn version(&mut self) -> MigrateResult<VersionState>;

    /// Replace the recorded version state.
    async fn set_version(&mut self, version: Option<i64>, dirty: bool) -> MigrateResult<()>;

    /// Execute the body of a migration file.
    async fn run(&mut self, sql: &str) -> MigrateResult<()>;
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// SQL creating the bookkeeping table.
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (version BIGINT NOT NULL PRIMARY KEY, dirty BOOLEAN NOT NULL)",
        quote_ident(table)
    )
}

/// Advisory lock key for a database/table pair (64-bit FNV-1a).
pub fn advisory_lock_key(database: &str, table: &str) -> i64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = OFFSET;
    for byte in database.bytes().chain([b':']).chain(table.bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    i64::from_ne_bytes(hash.to_ne_bytes())
}
