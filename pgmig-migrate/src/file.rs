//! Migration file management.
//!
//! Migrations live in one flat directory as pairs of files sharing a base
//! name:
//!
//! ```text
//! database/migrations/
//! ├── 20231215_120000_create_users.up.sql
//! ├── 20231215_120000_create_users.down.sql
//! ├── 20231216_090000_add_posts.up.sql
//! └── 20231216_090000_add_posts.down.sql
//! ```
//!
//! The numeric prefix is the unit's version. A `YYYYMMDD_HHMMSS` prefix is
//! read as one 14-digit number so that two units created on the same day
//! still get distinct versions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, TimeZone};
use regex_lite::Regex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};

/// Timestamp format used in generated file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Body written to the up file by `create`.
pub const UP_TEMPLATE: &str = "-- Write your UP migration here\n\n-- Example:\n-- CREATE TABLE example (id SERIAL PRIMARY KEY, name TEXT);\n";

/// Body written to the down file by `create`.
pub const DOWN_TEMPLATE: &str =
    "-- Write your DOWN migration here\n\n-- Example:\n-- DROP TABLE example;\n";

/// Up body of the unit synthesized by `init` when no migrations exist.
pub const INIT_UP_SQL: &str = r#"-- Table structure for table app settings
CREATE TABLE "app_settings" (
    "id" BIGSERIAL NOT NULL,
    "values" JSONB NOT NULL DEFAULT '{}'::jsonb,
    "created_at" TIMESTAMP(0),
    "updated_at" TIMESTAMP(0),
    CONSTRAINT "settings_pkey" PRIMARY KEY ("id")
);
"#;

/// Down body of the unit synthesized by `init`.
pub const INIT_DOWN_SQL: &str = r#"DROP TABLE IF EXISTS "app_settings";"#;

/// Direction of a migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Applies the unit.
    Up,
    /// Reverts the unit.
    Down,
}

impl Direction {
    /// File name suffix for this direction.
    pub fn suffix(self) -> &'static str {
        match self {
            Direction::Up => ".up.sql",
            Direction::Down => ".down.sql",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A parsed migration file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    /// Numeric version.
    pub version: i64,
    /// Name after the version prefix.
    pub name: String,
    /// Up or down.
    pub direction: Direction,
}

fn timestamp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{8})_(\d{6})_(.+)\.(up|down)\.sql$").expect("valid timestamp pattern")
    })
}

fn numeric_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)_(.+)\.(up|down)\.sql$").expect("valid numeric pattern"))
}

/// Parse a migration file name into version, name and direction.
///
/// Returns `None` for names that are not migration files.
pub fn parse_file_name(file_name: &str) -> Option<ParsedFileName> {
    let (digits, name, direction) = if let Some(caps) = timestamp_pattern().captures(file_name) {
        (
            format!("{}{}", &caps[1], &caps[2]),
            caps[3].to_string(),
            caps[4].to_string(),
        )
    } else {
        let caps = numeric_pattern().captures(file_name)?;
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    };

    let version = digits.parse::<i64>().ok()?;
    let direction = if direction == "up" {
        Direction::Up
    } else {
        Direction::Down
    };

    Some(ParsedFileName {
        version,
        name,
        direction,
    })
}

/// One migration unit: an up file and (usually) a down file sharing a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Numeric version.
    pub version: i64,
    /// Human readable name.
    pub name: String,
    /// Path of the up file.
    pub up: Option<PathBuf>,
    /// Path of the down file.
    pub down: Option<PathBuf>,
}

impl Migration {
    /// Path of the file for the given direction.
    pub fn path(&self, direction: Direction) -> Option<&Path> {
        match direction {
            Direction::Up => self.up.as_deref(),
            Direction::Down => self.down.as_deref(),
        }
    }

    /// Read the SQL body for a direction.
    pub async fn read(&self, direction: Direction) -> MigrateResult<String> {
        let path = self.path(direction).ok_or_else(|| {
            MigrationError::invalid(format!(
                "Migration {} ({}) has no {} file",
                self.version, self.name, direction
            ))
        })?;
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.version, self.name)
    }
}

/// Directory of migration files.
#[derive(Debug, Clone)]
pub struct MigrationSource {
    dir: PathBuf,
}

impl MigrationSource {
    /// Create a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether the directory is missing or has no entries at all.
    pub async fn is_empty(&self) -> MigrateResult<bool> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        Ok(entries.next_entry().await?.is_none())
    }

    /// Load all migration units, ordered by version.
    pub async fn load(&self) -> MigrateResult<Vec<Migration>> {
        let mut units: BTreeMap<i64, Migration> = BTreeMap::new();

        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(parsed) = parse_file_name(file_name) else {
                if file_name.ends_with(".sql") {
                    warn!(file = %file_name, "Ignoring file with unrecognized migration name");
                }
                continue;
            };

            let unit = units.entry(parsed.version).or_insert_with(|| Migration {
                version: parsed.version,
                name: parsed.name.clone(),
                up: None,
                down: None,
            });

            if unit.name != parsed.name {
                return Err(MigrationError::DuplicateVersion {
                    version: parsed.version,
                    first: unit.to_string(),
                    second: file_name.to_string(),
                });
            }

            let slot = match parsed.direction {
                Direction::Up => &mut unit.up,
                Direction::Down => &mut unit.down,
            };
            if let Some(existing) = slot {
                return Err(MigrationError::DuplicateVersion {
                    version: parsed.version,
                    first: existing.display().to_string(),
                    second: file_name.to_string(),
                });
            }
            *slot = Some(path.clone());
        }

        debug!(dir = %self.dir.display(), count = units.len(), "Loaded migrations");
        Ok(units.into_values().collect())
    }

    /// Find the single file named `*_{name}.up.sql` (or `.down.sql`).
    pub async fn find_by_name(&self, name: &str, direction: Direction) -> MigrateResult<PathBuf> {
        let wanted = format!("_{}{}", name, direction.suffix());
        let mut matches = Vec::new();

        if let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await {
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_match = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.len() > wanted.len() && n.ends_with(&wanted));
                if is_match && path.is_file() {
                    matches.push(path);
                }
            }
        }

        if matches.len() == 1 {
            Ok(matches.remove(0))
        } else {
            Err(MigrationError::NoMatchingFile {
                name: name.to_string(),
                candidates: matches.len(),
            })
        }
    }
}

/// Paths of a freshly written up/down pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPair {
    /// Up file.
    pub up: PathBuf,
    /// Down file.
    pub down: PathBuf,
}

/// Writes timestamp-prefixed migration pairs.
pub struct MigrationWriter {
    dir: PathBuf,
}

impl MigrationWriter {
    /// Create a writer for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensure the migrations directory exists.
    pub async fn ensure_dir(&self) -> MigrateResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write a pair named `{timestamp}_{name}` with the given bodies.
    ///
    /// Existing files are never overwritten.
    pub async fn write_pair<Tz>(
        &self,
        name: &str,
        up_sql: &str,
        down_sql: &str,
        at: DateTime<Tz>,
    ) -> MigrateResult<MigrationPair>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        validate_name(name)?;
        self.ensure_dir().await?;

        let base = format!("{}_{}", at.format(TIMESTAMP_FORMAT), name);
        let pair = MigrationPair {
            up: self.dir.join(format!("{}{}", base, Direction::Up.suffix())),
            down: self.dir.join(format!("{}{}", base, Direction::Down.suffix())),
        };

        write_new(&pair.up, up_sql).await?;
        write_new(&pair.down, down_sql).await?;

        Ok(pair)
    }

    /// Write a pair containing the placeholder templates.
    pub async fn create<Tz>(&self, name: &str, at: DateTime<Tz>) -> MigrateResult<MigrationPair>
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        self.write_pair(name, UP_TEMPLATE, DOWN_TEMPLATE, at).await
    }
}

fn validate_name(name: &str) -> MigrateResult<()> {
    if name.trim().is_empty() {
        return Err(MigrationError::invalid("Migration name must not be empty"));
    }
    if name.contains(['/', '\\']) {
        return Err(MigrationError::invalid(format!(
            "Migration name must not contain path separators: {}",
            name
        )));
    }
    Ok(())
}

async fn write_new(path: &Path, content: &str) -> MigrateResult<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                MigrationError::AlreadyExists(path.to_path_buf())
            } else {
                MigrationError::Io(e)
            }
        })?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
