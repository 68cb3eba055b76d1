//! Live-schema introspection seam.

use async_trait::async_trait;

use crate::error::MigrateResult;
use crate::model::TableSchema;

/// Reconstructs the current shape of a table from the database catalogs.
///
/// A table that does not exist is reported as a schema with an empty column
/// list, not as an error; the engine treats "no such table" as "will be
/// created". Failures while enriching columns with constraint data degrade
/// to best-effort: the affected attribute is simply absent.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn table_schema(&self, table: &str) -> MigrateResult<TableSchema>;
}
