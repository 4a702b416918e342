//! Migration engine implementation.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{MigrateResult, MigrationError};
use crate::file::{Direction, Migration, MigrationSource};
use crate::history::{MigrationDriver, NIL_VERSION, VersionState};

/// Result of a migration operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationResult {
    /// Versions applied, in order.
    pub applied: Vec<i64>,
    /// Versions reverted, in order.
    pub reverted: Vec<i64>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrationResult {
    /// Check if anything was applied or reverted.
    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty() || !self.reverted.is_empty()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.applied.is_empty() {
            parts.push(format!("{} applied", self.applied.len()));
        }

        if !self.reverted.is_empty() {
            parts.push(format!("{} reverted", self.reverted.len()));
        }

        if parts.is_empty() {
            "No migrations applied".to_string()
        } else {
            format!("{} in {}ms", parts.join(", "), self.duration_ms)
        }
    }
}

/// The main migration engine.
///
/// Every mutating operation runs under the driver's lock. The lock is
/// released even when the operation fails, and the operation's own error
/// wins over an unlock error.
pub struct Migrator<D: MigrationDriver> {
    source: MigrationSource,
    driver: D,
}

impl<D: MigrationDriver> Migrator<D> {
    /// Create a new migrator.
    pub fn new(source: MigrationSource, driver: D) -> Self {
        Self { source, driver }
    }

    /// Get the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Consume the migrator, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Apply every pending migration.
    pub async fn up(&mut self) -> MigrateResult<MigrationResult> {
        self.driver.lock().await?;
        let result = self.apply(None).await;
        self.release(result).await
    }

    /// Revert the most recently applied migration.
    pub async fn down(&mut self) -> MigrateResult<MigrationResult> {
        self.steps(-1).await
    }

    /// Apply (`n > 0`) or revert (`n < 0`) up to `|n|` migrations.
    ///
    /// When fewer are available the available ones are still applied and
    /// [`MigrationError::ShortLimit`] is returned.
    pub async fn steps(&mut self, n: i64) -> MigrateResult<MigrationResult> {
        if n == 0 {
            return Err(MigrationError::NoChange);
        }

        self.driver.lock().await?;
        let result = if n > 0 {
            self.apply(Some(n.unsigned_abs())).await
        } else {
            self.revert(n.unsigned_abs()).await
        };
        self.release(result).await
    }

    /// Record `version` as clean without running any SQL.
    ///
    /// `-1` clears the recorded version.
    pub async fn force(&mut self, version: i64) -> MigrateResult<()> {
        if version < NIL_VERSION {
            return Err(MigrationError::InvalidVersion(version));
        }

        self.driver.lock().await?;
        let result = self.force_locked(version).await;
        self.release(result).await
    }

    /// Read the recorded version state.
    pub async fn version(&mut self) -> MigrateResult<VersionState> {
        self.driver.initialize().await?;
        self.driver.version().await
    }

    async fn force_locked(&mut self, version: i64) -> MigrateResult<()> {
        self.driver.initialize().await?;
        let version = (version != NIL_VERSION).then_some(version);
        self.driver.set_version(version, false).await?;
        info!(version = ?version, "Forced version");
        Ok(())
    }

    async fn release<T>(&mut self, result: MigrateResult<T>) -> MigrateResult<T> {
        let unlocked = self.driver.unlock().await;
        let value = result?;
        unlocked?;
        Ok(value)
    }

    /// Load the source and check the recorded state against it.
    async fn prepare(&mut self) -> MigrateResult<(Vec<Migration>, VersionState)> {
        self.driver.initialize().await?;
        let migrations = self.source.load().await?;
        let mut state = self.driver.version().await?;

        if state.dirty {
            return Err(MigrationError::Dirty {
                version: state.version,
            });
        }

        if let Some(recorded) = state.version {
            let current = resolve_recorded(&migrations, recorded)
                .ok_or(MigrationError::UnknownVersion(recorded))?;
            if current != recorded {
                info!(recorded, version = current, "Matched date-only recorded version");
                state.version = Some(current);
            }
        }

        debug!(
            current = ?state.version,
            available = migrations.len(),
            "Prepared migration run"
        );
        Ok((migrations, state))
    }

    async fn apply(&mut self, limit: Option<u64>) -> MigrateResult<MigrationResult> {
        let start = Instant::now();
        let (migrations, state) = self.prepare().await?;

        let pending: Vec<&Migration> = migrations
            .iter()
            .filter(|m| state.version.is_none_or(|current| m.version > current))
            .collect();

        if pending.is_empty() {
            return Err(MigrationError::NoChange);
        }

        let take = limit.map_or(pending.len(), |n| n.min(pending.len() as u64) as usize);
        let mut result = MigrationResult::default();

        for migration in &pending[..take] {
            info!(version = migration.version, name = %migration.name, "Applying migration");
            let sql = migration.read(Direction::Up).await?;

            self.driver.set_version(Some(migration.version), true).await?;
            self.driver.run(&sql).await?;
            self.driver.set_version(Some(migration.version), false).await?;

            result.applied.push(migration.version);
        }

        result.duration_ms = start.elapsed().as_millis() as i64;
        info!("{}", result.summary());

        match limit {
            Some(n) if n > take as u64 => Err(MigrationError::ShortLimit {
                short: n - take as u64,
            }),
            _ => Ok(result),
        }
    }

    async fn revert(&mut self, limit: u64) -> MigrateResult<MigrationResult> {
        let start = Instant::now();
        let (migrations, state) = self.prepare().await?;

        let Some(current) = state.version else {
            return Err(MigrationError::NoChange);
        };

        // Applied units, newest first.
        let applied: Vec<&Migration> = migrations
            .iter()
            .rev()
            .skip_while(|m| m.version != current)
            .collect();

        let take = limit.min(applied.len() as u64) as usize;
        let mut result = MigrationResult::default();

        for (index, migration) in applied[..take].iter().enumerate() {
            let previous = applied.get(index + 1).map(|m| m.version);
            info!(version = migration.version, name = %migration.name, "Reverting migration");
            let sql = migration.read(Direction::Down).await?;

            self.driver.set_version(previous, true).await?;
            self.driver.run(&sql).await?;
            self.driver.set_version(previous, false).await?;

            result.reverted.push(migration.version);
        }

        result.duration_ms = start.elapsed().as_millis() as i64;
        info!("{}", result.summary());

        if limit > take as u64 {
            Err(MigrationError::ShortLimit {
                short: limit - take as u64,
            })
        } else {
            Ok(result)
        }
    }
}

/// Find the unit matching a recorded version.
///
/// Tools that read only the leading digits of `YYYYMMDD_HHMMSS_name` record
/// the bare date. Such a version maps onto the unit from that day when
/// exactly one exists.
fn resolve_recorded(migrations: &[Migration], recorded: i64) -> Option<i64> {
    if migrations.iter().any(|m| m.version == recorded) {
        return Some(recorded);
    }
    if !(10_000_000..=99_999_999).contains(&recorded) {
        return None;
    }

    let mut same_day = migrations
        .iter()
        .filter(|m| m.version / 1_000_000 == recorded);
    match (same_day.next(), same_day.next()) {
        (Some(m), None) => Some(m.version),
        _ => None,
    }
}
