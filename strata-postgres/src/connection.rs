//! PostgreSQL connection wrapper.

use deadpool_postgres::Object;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::debug;

use crate::error::PgResult;

/// A pooled connection.
///
/// Migration work is DDL-heavy, so there is no prepared-statement caching
/// here: catalog queries run ad hoc and migration files go through
/// [`batch_execute`](Self::batch_execute), which bypasses the extended
/// protocol entirely.
pub struct PgConnection {
    client: Object,
}

impl PgConnection {
    pub(crate) fn new(client: Object) -> Self {
        Self { client }
    }

    /// Execute a query and return all rows.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "executing query");
        let rows = self.client.query(sql, params).await?;
        Ok(rows)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<u64> {
        debug!(sql = %sql, "executing statement");
        let count = self.client.execute(sql, params).await?;
        Ok(count)
    }

    /// Execute a multi-statement script in a single round-trip.
    ///
    /// This is the execution path for whole migration files; their own
    /// `BEGIN;`/`COMMIT;` wrapper provides transactionality.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(bytes = sql.len(), "executing batch");
        self.client.batch_execute(sql).await?;
        Ok(())
    }
}
