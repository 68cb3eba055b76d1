//! The `schema_migrations` ledger and the migration SQL executor.

use async_trait::async_trait;
use tracing::debug;

use strata_migrate::{quote_ident, MigrateResult, MigrationError, MigrationLedger, SqlExecutor};

use crate::pool::PgPool;

/// Default name of the ledger table.
pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";

/// Ledger backed by a `(name, applied_at)` table.
///
/// Rows hold migration base names; `applied_at` carries the apply order.
pub struct PgLedger {
    pool: PgPool,
    table: String,
}

impl PgLedger {
    /// Create a ledger over the default table name.
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, DEFAULT_LEDGER_TABLE)
    }

    /// Create a ledger over a custom table name.
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// The ledger's table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn ensure_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    name TEXT PRIMARY KEY,\n    applied_at TIMESTAMPTZ NOT NULL DEFAULT now()\n)",
            quote_ident(&self.table)
        )
    }
}

#[async_trait]
impl MigrationLedger for PgLedger {
    async fn initialize(&self) -> MigrateResult<()> {
        let conn = self.pool.get().await.map_err(MigrationError::from)?;
        conn.execute(&self.ensure_sql(), &[]).await.map_err(MigrationError::from)?;
        Ok(())
    }

    async fn applied(&self) -> MigrateResult<Vec<String>> {
        // Bootstrap first so a fresh database reads as "nothing applied".
        self.initialize().await?;

        let conn = self.pool.get().await.map_err(MigrationError::from)?;
        let sql = format!(
            "SELECT name FROM {} ORDER BY applied_at ASC",
            quote_ident(&self.table)
        );
        let rows = conn.query(&sql, &[]).await.map_err(MigrationError::from)?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn record(&self, name: &str) -> MigrateResult<()> {
        let conn = self.pool.get().await.map_err(MigrationError::from)?;
        let sql = format!(
            "INSERT INTO {} (name) VALUES ($1)",
            quote_ident(&self.table)
        );
        conn.execute(&sql, &[&name]).await.map_err(MigrationError::from)?;
        debug!(migration = %name, "ledger row inserted");
        Ok(())
    }

    async fn remove(&self, name: &str) -> MigrateResult<()> {
        let conn = self.pool.get().await.map_err(MigrationError::from)?;
        let sql = format!(
            "DELETE FROM {} WHERE name = $1",
            quote_ident(&self.table)
        );
        conn.execute(&sql, &[&name]).await.map_err(MigrationError::from)?;
        debug!(migration = %name, "ledger row removed");
        Ok(())
    }
}

#[async_trait]
impl SqlExecutor for PgPool {
    async fn batch_execute(&self, sql: &str) -> MigrateResult<()> {
        let conn = self.get().await.map_err(MigrationError::from)?;
        conn.batch_execute(sql).await.map_err(MigrationError::from)?;
        Ok(())
    }
}
