//! Catalog introspection: rebuilding a [`TableSchema`] for a live table.
//!
//! Four catalog passes per table: columns, primary key, unique
//! constraints, foreign keys. The column pass is authoritative; if it
//! fails the whole fetch fails, and zero rows mean the table does not
//! exist. The three constraint passes only enrich columns, and their
//! failures degrade to a warning so a partially readable table still
//! diffs.

use async_trait::async_trait;
use tracing::warn;

use strata_migrate::{
    ColumnAttributes, ColumnMeta, ForeignKey, MigrateResult, MigrationError, ReferentialAction,
    SchemaIntrospector, TableSchema,
};

use crate::pool::PgPool;

const COLUMNS_SQL: &str = "\
SELECT
    col.column_name,
    col.udt_name,
    col.data_type,
    col.is_nullable,
    col.column_default
FROM information_schema.columns col
WHERE col.table_name = $1
ORDER BY col.ordinal_position";

const PRIMARY_KEY_SQL: &str = "\
SELECT
    a.attname,
    c.conname
FROM pg_index i
JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
JOIN pg_class t ON t.oid = i.indrelid
JOIN pg_constraint c ON c.conindid = i.indexrelid
WHERE t.relname = $1 AND i.indisprimary";

const UNIQUE_SQL: &str = "\
SELECT
    a.attname,
    c.conname
FROM pg_constraint c
JOIN pg_class t ON t.oid = c.conrelid
JOIN unnest(c.conkey) WITH ORDINALITY AS cols(attnum, ord) ON true
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = cols.attnum
WHERE t.relname = $1 AND c.contype = 'u'";

const FOREIGN_KEY_SQL: &str = "\
SELECT
    kcu.column_name,
    ccu.table_name AS foreign_table_name,
    ccu.column_name AS foreign_column_name,
    rc.update_rule,
    rc.delete_rule,
    tc.constraint_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
    ON tc.constraint_name = kcu.constraint_name
   AND tc.table_name = kcu.table_name
JOIN information_schema.constraint_column_usage ccu
    ON ccu.constraint_name = tc.constraint_name
JOIN information_schema.referential_constraints rc
    ON rc.constraint_name = tc.constraint_name
WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_name = $1";

/// Reads table shapes out of the PostgreSQL catalogs.
pub struct PgIntrospector {
    pool: PgPool,
}

impl PgIntrospector {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaIntrospector for PgIntrospector {
    async fn table_schema(&self, table: &str) -> MigrateResult<TableSchema> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| MigrationError::introspection(format!("acquire connection: {e}")))?;

        // ---------- columns (authoritative) ----------
        let rows = conn
            .query(COLUMNS_SQL, &[&table])
            .await
            .map_err(|e| MigrationError::introspection(format!("query columns for {table}: {e}")))?;

        let mut columns: Vec<ColumnMeta> = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let name: String = row.get(0);
            let udt_name: String = row.get(1);
            let data_type: String = row.get(2);
            let is_nullable: String = row.get(3);
            let default: Option<String> = row.get(4);

            // information_schema reports element types for arrays; the
            // literal ARRAY marker keeps them from aliasing their element.
            let pg_type = if data_type == "ARRAY" {
                data_type
            } else {
                udt_name
            };

            columns.push(ColumnMeta {
                field_name: name.clone(),
                column_name: name,
                index: i,
                attrs: ColumnAttributes {
                    pg_type,
                    not_null: is_nullable == "NO",
                    default,
                    ..Default::default()
                },
            });
        }

        let mut schema = TableSchema {
            table_name: table.to_string(),
            columns,
        };
        if !schema.exists() {
            return Ok(schema);
        }

        // ---------- primary key (best effort) ----------
        match conn.query(PRIMARY_KEY_SQL, &[&table]).await {
            Ok(rows) => {
                for row in rows {
                    let column: String = row.get(0);
                    let conname: String = row.get(1);
                    if let Some(col) = column_mut(&mut schema, &column) {
                        col.attrs.is_pk = true;
                        col.attrs.not_null = true;
                        col.attrs.constraint_name = Some(conname);
                    }
                }
            }
            Err(e) => warn!(table = %table, error = %e, "primary key introspection failed"),
        }

        // ---------- unique constraints (best effort) ----------
        match conn.query(UNIQUE_SQL, &[&table]).await {
            Ok(rows) => {
                for row in rows {
                    let column: String = row.get(0);
                    let conname: String = row.get(1);
                    if let Some(col) = column_mut(&mut schema, &column) {
                        col.attrs.unique = true;
                        col.attrs.constraint_name = Some(conname);
                    }
                }
            }
            Err(e) => warn!(table = %table, error = %e, "unique introspection failed"),
        }

        // ---------- foreign keys (best effort) ----------
        match conn.query(FOREIGN_KEY_SQL, &[&table]).await {
            Ok(rows) => {
                for row in rows {
                    let column: String = row.get(0);
                    let ref_table: String = row.get(1);
                    let ref_column: String = row.get(2);
                    let update_rule: String = row.get(3);
                    let delete_rule: String = row.get(4);
                    let conname: String = row.get(5);

                    if let Some(col) = column_mut(&mut schema, &column) {
                        col.attrs.foreign_key = Some(ForeignKey {
                            ref_table,
                            ref_column,
                            on_update: ReferentialAction::parse(&update_rule),
                            on_delete: ReferentialAction::parse(&delete_rule),
                        });
                        col.attrs.constraint_name = Some(conname);
                    }
                }
            }
            Err(e) => warn!(table = %table, error = %e, "foreign key introspection failed"),
        }

        Ok(schema)
    }
}

fn column_mut<'a>(schema: &'a mut TableSchema, name: &str) -> Option<&'a mut ColumnMeta> {
    schema.columns.iter_mut().find(|c| c.column_name == name)
}
