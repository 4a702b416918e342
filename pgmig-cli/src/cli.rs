//! CLI argument definitions using clap.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

/// Long flags that are also accepted with a single dash (`-cmd up`).
const SINGLE_DASH_LONG_FLAGS: [&str; 8] = [
    "cmd",
    "steps",
    "force",
    "env",
    "seed-file",
    "name",
    "config",
    "help",
];

/// pgmig - PostgreSQL migrations, seeding and bootstrap from plain SQL files
#[derive(Parser, Debug)]
#[command(name = "pgmig")]
#[command(version)]
#[command(
    about = "pgmig - PostgreSQL migrations, seeding and bootstrap from plain SQL files",
    long_about = None
)]
pub struct Cli {
    /// Command to run
    #[arg(long, value_enum, default_value_t = CommandName::Up)]
    pub cmd: CommandName,

    /// Number of steps for `steps` (negative reverts)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub steps: i64,

    /// Version to record for `force` (-1 clears the version)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub force: i64,

    /// Environment whose seed file is used (database/seeds/<env>.sql)
    #[arg(long, default_value = "dev")]
    pub env: String,

    /// Seed file to use instead of the environment default
    #[arg(long)]
    pub seed_file: Option<PathBuf>,

    /// Migration name for `create`, or a single migration to run with `up`/`down`
    #[arg(long)]
    pub name: Option<String>,

    /// Path to the project config file (defaults to ./pgmig.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse the process arguments, accepting single-dash long flags.
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// The `--name` value, if present and non-empty.
    pub fn migration_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Available commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandName {
    /// Apply all pending migrations (or one named migration)
    #[default]
    Up,
    /// Revert the most recent migration (or run one named down file)
    Down,
    /// Record a version without running SQL
    Force,
    /// Apply or revert a number of migrations
    Steps,
    /// Print the current version
    Version,
    /// Run the seed file
    Seed,
    /// Create the database, migrate and seed
    Init,
    /// Create a new migration pair
    Create,
}

impl CommandName {
    /// Name as typed on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::Up => "up",
            CommandName::Down => "down",
            CommandName::Force => "force",
            CommandName::Steps => "steps",
            CommandName::Version => "version",
            CommandName::Seed => "seed",
            CommandName::Init => "init",
            CommandName::Create => "create",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rewrite `-flag` and `-flag=value` to `--flag` for known long flags.
///
/// Everything after a bare `--` is left alone, as are negative numbers and
/// short flags.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;

    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }

            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let flag = rest.split_once('=').map_or(rest, |(flag, _)| flag);
                    if SINGLE_DASH_LONG_FLAGS.contains(&flag) {
                        OsString::from(format!("-{}", text))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
