//! Logging setup for the pgmig binary.
//!
//! # Environment Variables
//!
//! - `PGMIG_LOG` - An `EnvFilter` directive (e.g. `pgmig_migrate=trace`); overrides `-v`
//! - `PGMIG_LOG_FORMAT=compact|pretty|json` - Output format (default: compact)
//!
//! Without `PGMIG_LOG` the level follows the `-v` count: `info`, then
//! `debug`, then `trace`. Log lines go to stderr so command output on stdout
//! stays clean.

use std::env;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Filter override variable
pub const LOG_ENV_VAR: &str = "PGMIG_LOG";

/// Format variable
pub const LOG_FORMAT_ENV_VAR: &str = "PGMIG_LOG_FORMAT";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human readable output
    #[default]
    Compact,
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back to compact.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("json") => Self::Json,
            _ => Self::Compact,
        }
    }

    /// Get the configured format from `PGMIG_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::parse(env::var(LOG_FORMAT_ENV_VAR).ok().as_deref())
    }
}

/// Level for a `-v` count.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Filter directives scoping `level` to pgmig's own crates.
pub fn default_directives(level: &str) -> String {
    format!(
        "warn,pgmig={level},pgmig_cli={level},pgmig_migrate={level}",
        level = level
    )
}

fn build_filter(verbose: u8) -> EnvFilter {
    if let Ok(directives) = env::var(LOG_ENV_VAR) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    EnvFilter::try_new(default_directives(level_for_verbosity(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging.
///
/// This should be called once at startup. Subsequent calls are no-ops, and a
/// subscriber installed by someone else is left in place.
pub fn init(verbose: u8) {
    INIT.call_once(|| {
        let filter = build_filter(verbose);
        let format = LogFormat::from_env();

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Compact => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        if result.is_ok() {
            tracing::debug!(format = ?format, "Logging initialized");
        }
    });
}
