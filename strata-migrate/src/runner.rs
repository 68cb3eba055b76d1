//! Applying and reverting migrations.
//!
//! The runner walks the migrations directory and the ledger: `run` applies
//! every up-file without a ledger row in lexicographic (= chronological)
//! order, `rollback` reverts the last N applied in reverse apply order, and
//! `status` reports both sides. Each SQL file is executed as a single
//! driver call; the `BEGIN;`/`COMMIT;` wrapper inside the file provides
//! transactionality.
//!
//! Exactly one runner is expected to touch a given database at a time; the
//! engine takes no cross-process lock.
//!
//! Failures never unwind work already done: reports carry the names that
//! were processed before the error, and the ledger reflects exactly the
//! migrations whose SQL call returned success.

use tracing::{debug, info};

use crate::error::{MigrateResult, MigrationError};
use crate::file::MigrationFileManager;
use crate::ledger::{MigrationLedger, SqlExecutor};

/// Outcome of a `run` invocation: what was applied, and the error that
/// stopped the walk, if any.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub error: Option<MigrationError>,
}

impl ApplyReport {
    /// Whether every pending migration was applied.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a `rollback` invocation.
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub rolled_back: Vec<String>,
    pub error: Option<MigrationError>,
}

impl RollbackReport {
    /// Whether every requested migration was reverted.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Applied and pending migrations, both in their natural order.
#[derive(Debug, Default)]
pub struct StatusReport {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
}

/// Applies and reverts migration files against the ledger.
pub struct MigrationRunner<L, E> {
    ledger: L,
    executor: E,
    files: MigrationFileManager,
}

impl<L, E> MigrationRunner<L, E>
where
    L: MigrationLedger,
    E: SqlExecutor,
{
    pub fn new(ledger: L, executor: E, files: MigrationFileManager) -> Self {
        Self {
            ledger,
            executor,
            files,
        }
    }

    /// Apply every pending up-file in file order.
    ///
    /// Whitespace-only up-files are skipped without being recorded. On a
    /// failure the report carries the migrations applied so far together
    /// with the error; the failed migration is not recorded.
    pub async fn run(&self) -> MigrateResult<ApplyReport> {
        self.ledger.initialize().await?;

        let bases = self.files.list_up_bases().await?;
        let applied: std::collections::HashSet<String> =
            self.ledger.applied().await?.into_iter().collect();

        let mut report = ApplyReport::default();

        for base in bases {
            if applied.contains(&base) {
                continue;
            }

            let sql = match self.files.read_up(&base).await {
                Ok(content) => content,
                Err(e) => {
                    report.error = Some(e);
                    return Ok(report);
                }
            };

            if sql.trim().is_empty() {
                debug!(migration = %base, "skipping empty up file");
                continue;
            }

            if let Err(e) = self.executor.batch_execute(&sql).await {
                report.error = Some(with_context("apply", &base, e));
                return Ok(report);
            }

            if let Err(e) = self.ledger.record(&base).await {
                report.error = Some(e);
                return Ok(report);
            }

            info!(migration = %base, "applied");
            report.applied.push(base);
        }

        Ok(report)
    }

    /// Revert the last `n` applied migrations, most recent first.
    ///
    /// `n` larger than the applied count reverts everything. A missing or
    /// whitespace-only down-file is fatal for that migration; reverts
    /// completed earlier in the same invocation stand.
    pub async fn rollback(&self, n: usize) -> MigrateResult<RollbackReport> {
        if n == 0 {
            return Err(MigrationError::invalid_migration("N must be ≥ 1"));
        }

        let applied = self.ledger.applied().await?;
        let mut report = RollbackReport::default();
        if applied.is_empty() {
            return Ok(report);
        }

        let k = n.min(applied.len());
        for base in applied[applied.len() - k..].iter().rev() {
            if !self.files.down_exists(base) {
                report.error = Some(MigrationError::MissingDownFile(base.clone()));
                return Ok(report);
            }

            let sql = match self.files.read_down(base).await {
                Ok(content) => content,
                Err(e) => {
                    report.error = Some(e);
                    return Ok(report);
                }
            };

            if sql.trim().is_empty() {
                report.error = Some(MigrationError::EmptyDownFile(base.clone()));
                return Ok(report);
            }

            if let Err(e) = self.executor.batch_execute(&sql).await {
                report.error = Some(with_context("rollback", base, e));
                return Ok(report);
            }

            if let Err(e) = self.ledger.remove(base).await {
                report.error = Some(e);
                return Ok(report);
            }

            info!(migration = %base, "rolled back");
            report.rolled_back.push(base.clone());
        }

        Ok(report)
    }

    /// Applied migrations (ledger order) and pending up-file bases (file
    /// order).
    pub async fn status(&self) -> MigrateResult<StatusReport> {
        let applied = self.ledger.applied().await?;
        let bases = self.files.list_up_bases().await?;

        let applied_set: std::collections::HashSet<&str> =
            applied.iter().map(String::as_str).collect();
        let pending = bases
            .into_iter()
            .filter(|b| !applied_set.contains(b.as_str()))
            .collect();

        Ok(StatusReport { applied, pending })
    }
}

/// Attach the migration name to a database failure without stacking error
/// prefixes.
fn with_context(op: &str, base: &str, e: MigrationError) -> MigrationError {
    match e {
        MigrationError::Database(msg) => MigrationError::Database(format!("{op} {base}: {msg}")),
        other => other,
    }
}
