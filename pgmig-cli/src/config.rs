//! CLI configuration handling.
//!
//! Connection settings come from the environment (optionally seeded from a
//! `.env` file). Directory layout and the bookkeeping table name come from an
//! optional `pgmig.toml` in the project root.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pgmig_migrate::DEFAULT_TABLE;
use serde::{Deserialize, Serialize};
use tokio_postgres::config::SslMode;

use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "pgmig.toml";

/// Default migrations directory (relative to project root)
pub const MIGRATIONS_DIR: &str = "database/migrations";

/// Default seeds directory (relative to project root)
pub const SEEDS_DIR: &str = "database/seeds";

/// Administrative database used by `init`.
pub const ADMIN_DATABASE: &str = "postgres";

/// Required connection variables, in reporting order.
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "POSTGRES_DB",
];

/// Optional connect timeout in seconds.
pub const CONNECT_TIMEOUT_ENV_VAR: &str = "POSTGRES_CONNECT_TIMEOUT";

/// Project configuration from `pgmig.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory layout
    pub paths: PathsConfig,

    /// Migration settings
    pub migrations: MigrationsConfig,
}

impl ProjectConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load an explicit config file, or `pgmig.toml` in `root` if present.
    ///
    /// A missing implicit file yields the defaults; a missing explicit file
    /// is an error.
    pub fn resolve(root: &Path, explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) => Self::load(&root.join(path)),
            None => {
                let path = root.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Directory layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Migrations directory
    pub migrations: PathBuf,

    /// Seeds directory
    pub seeds: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            migrations: PathBuf::from(MIGRATIONS_DIR),
            seeds: PathBuf::from(SEEDS_DIR),
        }
    }
}

/// Migration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Bookkeeping table name
    pub table: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Database connection settings
#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Role name
    pub user: String,
    /// Role password
    pub password: String,
    /// Server host
    pub host: String,
    /// Server port, kept as given
    pub port: String,
    /// Target database name
    pub database: String,
    /// Connect timeout, if configured
    pub connect_timeout: Option<Duration>,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"****")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl DatabaseConfig {
    /// Resolve from the process environment
    pub fn from_env() -> CliResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` for variable values
    pub fn from_lookup<F>(lookup: F) -> CliResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let values: Vec<Option<String>> = REQUIRED_ENV_VARS
            .iter()
            .map(|key| lookup(key).filter(|v| !v.is_empty()))
            .collect();

        let missing: Vec<&str> = REQUIRED_ENV_VARS
            .iter()
            .zip(&values)
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            return Err(CliError::Config(format!(
                "Missing required env vars: {}",
                missing.join(", ")
            )));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();

        let connect_timeout = match lookup(CONNECT_TIMEOUT_ENV_VAR).filter(|v| !v.is_empty()) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    CliError::Config(format!(
                        "{} must be a number of seconds, got '{}'",
                        CONNECT_TIMEOUT_ENV_VAR, raw
                    ))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            user: next(),
            password: next(),
            host: next(),
            port: next(),
            database: next(),
            connect_timeout,
        })
    }

    /// Connection URL
    pub fn url(&self) -> String {
        self.url_with_password(&self.password)
    }

    /// Connection URL with the password masked, for logs
    pub fn redacted_url(&self) -> String {
        self.url_with_password("****")
    }

    fn url_with_password(&self, password: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            self.user, password, self.host, self.port, self.database
        )
    }

    /// Driver config for the target database
    pub fn pg_config(&self) -> CliResult<tokio_postgres::Config> {
        self.pg_config_for(&self.database)
    }

    /// Driver config for the administrative database
    pub fn admin_pg_config(&self) -> CliResult<tokio_postgres::Config> {
        self.pg_config_for(ADMIN_DATABASE)
    }

    fn pg_config_for(&self, dbname: &str) -> CliResult<tokio_postgres::Config> {
        let port: u16 = self.port.trim().parse().map_err(|_| {
            CliError::Config(format!("POSTGRES_PORT is not a valid port: '{}'", self.port))
        })?;

        let mut config = tokio_postgres::Config::new();
        config
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(port)
            .dbname(dbname)
            .ssl_mode(SslMode::Disable);

        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout(timeout);
        }

        Ok(config)
    }
}

/// Everything a command needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct Context {
    /// Connection settings
    pub database: DatabaseConfig,
    /// Project settings
    pub project: ProjectConfig,
    /// Project root that relative paths resolve against
    pub root: PathBuf,
}

impl Context {
    /// Resolve from the current directory and process environment
    pub fn load(config_path: Option<&Path>) -> CliResult<Self> {
        let root = std::env::current_dir()?;
        let database = DatabaseConfig::from_env()?;
        let project = ProjectConfig::resolve(&root, config_path)?;
        Ok(Self {
            database,
            project,
            root,
        })
    }

    /// Migrations directory
    pub fn migrations_dir(&self) -> PathBuf {
        self.root.join(&self.project.paths.migrations)
    }

    /// Seeds directory
    pub fn seeds_dir(&self) -> PathBuf {
        self.root.join(&self.project.paths.seeds)
    }

    /// Bookkeeping table name
    pub fn table(&self) -> &str {
        &self.project.migrations.table
    }
}
