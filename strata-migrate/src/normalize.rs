//! Schema canonicalization.
//!
//! Declared and introspected schemas spell the same shape differently:
//! `varchar(255)` vs `character varying`, `now()` vs `now()::text`, mixed
//! identifier case in foreign-key targets. Both sides are normalized before
//! diffing so that only semantic differences survive. Normalization is
//! idempotent and returns a fresh value.

use crate::model::TableSchema;

/// Return a canonicalized copy of a schema.
///
/// Column ordering and column names are preserved verbatim.
pub fn normalize_schema(schema: &TableSchema) -> TableSchema {
    let mut out = schema.clone();

    for col in &mut out.columns {
        col.attrs.pg_type = normalize_pg_type(&col.attrs.pg_type);
        col.attrs.default = col.attrs.default.as_deref().map(normalize_default);

        if let Some(fk) = col.attrs.foreign_key.as_mut() {
            fk.ref_table = fk.ref_table.to_lowercase();
            fk.ref_column = fk.ref_column.to_lowercase();
            // Actions are a closed enum; empty spellings already collapsed
            // to NO ACTION at parse time.
        }
    }

    out
}

/// Canonical type spelling: trimmed, lowercased, varchar aliases collapsed.
fn normalize_pg_type(pg_type: &str) -> String {
    let t = pg_type.trim().to_lowercase();
    match t.as_str() {
        "character varying" | "varchar" | "varchar()" | "varchar(255)" => "varchar".to_string(),
        _ => t,
    }
}

/// Canonical default expression: trimmed, lowercased, with trailing
/// text/varchar casts stripped.
fn normalize_default(default: &str) -> String {
    let d = default.trim();
    let d = d.strip_suffix("::text").unwrap_or(d);
    let d = d.strip_suffix("::varchar").unwrap_or(d);
    d.to_lowercase()
}
