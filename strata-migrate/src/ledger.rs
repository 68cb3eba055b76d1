//! Applied-migration tracking and SQL execution seams.
//!
//! The engine never talks to a driver directly; the runner and planner are
//! written against these traits and `strata-postgres` supplies the real
//! implementations. Tests use in-memory ones.

use async_trait::async_trait;

use crate::error::MigrateResult;

/// The ledger of applied migrations.
///
/// Rows are keyed by migration base name (no `.up.sql`/`.down.sql` suffix).
/// A row is inserted on successful apply and deleted on successful revert;
/// there is no in-place update.
#[async_trait]
pub trait MigrationLedger: Send + Sync {
    /// Create the ledger table when absent.
    async fn initialize(&self) -> MigrateResult<()>;

    /// Applied migration names ordered by `applied_at` ascending.
    /// Implementations bootstrap the ledger table first, so this is safe
    /// to call against a fresh database.
    async fn applied(&self) -> MigrateResult<Vec<String>>;

    /// Record a migration as applied.
    async fn record(&self, name: &str) -> MigrateResult<()>;

    /// Delete a migration's ledger row after a successful revert.
    async fn remove(&self, name: &str) -> MigrateResult<()>;
}

/// Executes one migration file's SQL as a single driver call.
///
/// Transactionality comes from the `BEGIN;`/`COMMIT;` wrapper inside the
/// file content itself.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn batch_execute(&self, sql: &str) -> MigrateResult<()>;
}
