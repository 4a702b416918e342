//! Error types for the migration engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation error.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid migration file or format.
    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    /// Two migration units share a version.
    #[error("Duplicate migration version {version}: {first} and {second}")]
    DuplicateVersion {
        /// The shared version.
        version: i64,
        /// First file found with this version.
        first: String,
        /// Second file found with this version.
        second: String,
    },

    /// The recorded version has no matching migration file.
    #[error("No migration found for recorded version {0}")]
    UnknownVersion(i64),

    /// Nothing to apply or revert.
    #[error("no change")]
    NoChange,

    /// A previous migration failed part-way through.
    #[error(
        "Dirty database version {}. Fix the schema by hand, then run `force` with the correct version",
        format_version(.version)
    )]
    Dirty {
        /// Version recorded as dirty, `None` for a failed revert of the first unit.
        version: Option<i64>,
    },

    /// Fewer migration units were available than the requested step count.
    #[error("Requested more steps than available: {short} step(s) short")]
    ShortLimit {
        /// Number of steps that could not be taken.
        short: u64,
    },

    /// Version argument out of range.
    #[error("Invalid version {0}: expected -1 or a non-negative version")]
    InvalidVersion(i64),

    /// Single-migration lookup did not resolve to exactly one file.
    #[error("no matching migration file found for '{name}'{}", candidates_note(.candidates))]
    NoMatchingFile {
        /// Name that was looked up.
        name: String,
        /// How many files matched (0 or more than 1).
        candidates: usize,
    },

    /// A statement of a script failed.
    #[error("statement failed: {statement}\n{message}")]
    Statement {
        /// The failing SQL text.
        statement: String,
        /// Underlying database error.
        message: String,
    },

    /// Refusing to overwrite an existing migration file.
    #[error("Migration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Lock acquisition or release failed.
    #[error("Failed to acquire migration lock: {0}")]
    Lock(String),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid migration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidMigration(msg.into())
    }

    /// Create a statement error.
    pub fn statement(statement: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Statement {
            statement: statement.into(),
            message: message.to_string(),
        }
    }

    /// Check if this is the "nothing to do" outcome.
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}

impl From<tokio_postgres::Error> for MigrationError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Database(err.to_string())
    }
}

fn format_version(version: &Option<i64>) -> String {
    version.map_or_else(|| "<none>".to_string(), |v| v.to_string())
}

fn candidates_note(candidates: &usize) -> String {
    if *candidates > 1 {
        format!(" ({} candidates)", candidates)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matching_file_display() {
        let err = MigrationError::NoMatchingFile {
            name: "widgets".to_string(),
            candidates: 0,
        };
        assert_eq!(
            err.to_string(),
            "no matching migration file found for 'widgets'"
        );
    }

    #[test]
    fn test_no_matching_file_reports_ambiguity() {
        let err = MigrationError::NoMatchingFile {
            name: "widgets".to_string(),
            candidates: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("no matching migration file found"));
        assert!(msg.contains("2 candidates"));
    }

    #[test]
    fn test_statement_display_includes_sql() {
        let err = MigrationError::statement("INSERT INTO t VALUES (", "syntax error at end of input");
        let msg = err.to_string();
        assert!(msg.contains("INSERT INTO t VALUES ("));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_dirty_display() {
        let err = MigrationError::Dirty {
            version: Some(20230101000000),
        };
        assert!(err.to_string().contains("20230101000000"));

        let err = MigrationError::Dirty { version: None };
        assert!(err.to_string().contains("<none>"));
    }

    #[test]
    fn test_is_no_change() {
        assert!(MigrationError::NoChange.is_no_change());
        assert!(!MigrationError::database("connection refused").is_no_change());
    }
}
