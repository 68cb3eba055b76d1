//! Table diff generation.
//!
//! Given two normalized schemas `(old, new)`, the generator produces a
//! [`TableDiff`] whose `up` list transforms a database matching `old` into
//! `new`, and whose `down` list restores `old` from `new`. Down statements
//! are prepended so that reverse order is preserved across every operation.
//!
//! Every statement is written to be safe to re-execute: column adds use
//! `IF NOT EXISTS`, drops use `IF EXISTS`, constraint adds are wrapped in a
//! `pg_constraint` presence check, and `SET NOT NULL` only fires when the
//! column holds no NULLs. Identifiers are quoted with [`quote_ident`]; the
//! expressions inside `DEFAULT` clauses originate from developer-authored
//! tags and are emitted verbatim (PostgreSQL does not accept bind
//! parameters in DDL).

use std::collections::HashMap;

use crate::model::{ColumnMeta, ForeignKey, TableDiff, TableSchema};

/// Generates per-table forward/reverse DDL statement lists.
#[derive(Debug, Default)]
pub struct DiffGenerator;

impl DiffGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Diff two normalized schemas for the same table.
    pub fn diff(&self, old: &TableSchema, new: &TableSchema) -> TableDiff {
        if old.columns.is_empty() && !new.columns.is_empty() {
            return self.create_table_diff(new);
        }

        let mut diff = TableDiff::default();
        let old_cols: HashMap<&str, &ColumnMeta> = old
            .columns
            .iter()
            .map(|c| (c.column_name.as_str(), c))
            .collect();
        let new_cols: HashMap<&str, &ColumnMeta> = new
            .columns
            .iter()
            .map(|c| (c.column_name.as_str(), c))
            .collect();

        for col in &new.columns {
            match old_cols.get(col.column_name.as_str()) {
                None => self.added_column(&mut diff, &new.table_name, col),
                Some(old_col) => self.changed_column(&mut diff, &new.table_name, old_col, col),
            }
        }

        for col in &old.columns {
            if !new_cols.contains_key(col.column_name.as_str()) {
                self.removed_column(&mut diff, &old.table_name, col);
            }
        }

        let old_pks = old.primary_key_columns();
        let new_pks = new.primary_key_columns();
        if !same_column_set(&old_pks, &new_pks) {
            self.primary_key_change(&mut diff, &new.table_name, &old_pks, &new_pks);
        }

        diff
    }

    /// Emit a whole-table CREATE with inline PK and unique constraints.
    /// Foreign keys are deliberately not inlined: they are appended as
    /// guarded ALTERs so that self-references and forward references
    /// resolve once every table exists.
    fn create_table_diff(&self, new: &TableSchema) -> TableDiff {
        let mut diff = TableDiff::default();

        let mut parts: Vec<String> = Vec::with_capacity(new.columns.len() + 2);
        let mut pk_cols: Vec<String> = Vec::new();
        let mut uniques: Vec<String> = Vec::new();

        for col in &new.columns {
            parts.push(self.column_definition(col));

            if col.attrs.is_pk {
                pk_cols.push(quote_ident(&col.column_name));
            }
            if col.attrs.unique {
                let name = unique_constraint_name(&new.table_name, &col.column_name);
                uniques.push(format!(
                    "CONSTRAINT {} UNIQUE ({})",
                    quote_ident(&name),
                    quote_ident(&col.column_name)
                ));
            }
        }

        if !pk_cols.is_empty() {
            parts.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(&pk_constraint_name(&new.table_name)),
                pk_cols.join(", ")
            ));
        }
        parts.extend(uniques);

        diff.up.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            quote_ident(&new.table_name),
            parts.join(",\n  ")
        ));
        diff.down.insert(
            0,
            format!(
                "DROP TABLE IF EXISTS {} CASCADE",
                quote_ident(&new.table_name)
            ),
        );

        for col in &new.columns {
            if let Some(fk) = &col.attrs.foreign_key {
                self.add_foreign_key(&mut diff, &new.table_name, &col.column_name, fk);
            }
        }

        diff
    }

    fn added_column(&self, diff: &mut TableDiff, table: &str, col: &ColumnMeta) {
        let mut stmt = format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            quote_ident(table),
            quote_ident(&col.column_name),
            col.attrs.pg_type
        );

        if let Some(default) = &col.attrs.default {
            stmt.push_str(" DEFAULT ");
            stmt.push_str(default);
        }

        if col.attrs.not_null {
            if col.attrs.default.is_none() {
                // No default: existing rows would violate NOT NULL, so the
                // constraint is applied separately behind a data guard.
                diff.up.push(stmt);
                diff.up.push(set_not_null_guard(table, &col.column_name));
            } else {
                stmt.push_str(" NOT NULL");
                diff.up.push(stmt);
            }
        } else {
            diff.up.push(stmt);
        }

        diff.down.insert(
            0,
            format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {}",
                quote_ident(table),
                quote_ident(&col.column_name)
            ),
        );

        if col.attrs.unique {
            self.add_unique_constraint(diff, table, col);
        }
        if let Some(fk) = &col.attrs.foreign_key {
            self.add_foreign_key(diff, table, &col.column_name, fk);
        }
    }

    /// Per-aspect changes in fixed order: type, nullability, default,
    /// uniqueness, foreign key.
    fn changed_column(&self, diff: &mut TableDiff, table: &str, old: &ColumnMeta, new: &ColumnMeta) {
        if old.attrs.pg_type != new.attrs.pg_type {
            diff.up.push(alter_column_type(table, &new.column_name, &new.attrs.pg_type));
            diff.down
                .insert(0, alter_column_type(table, &new.column_name, &old.attrs.pg_type));
        }

        if old.attrs.not_null != new.attrs.not_null {
            if new.attrs.not_null {
                diff.up.push(set_not_null_guard(table, &new.column_name));
                diff.down.insert(0, drop_not_null(table, &new.column_name));
            } else {
                diff.up.push(drop_not_null(table, &new.column_name));
                diff.down
                    .insert(0, set_not_null_guard(table, &new.column_name));
            }
        }

        if old.attrs.default != new.attrs.default {
            diff.up
                .push(alter_column_default(table, &new.column_name, new.attrs.default.as_deref()));
            diff.down.insert(
                0,
                alter_column_default(table, &new.column_name, old.attrs.default.as_deref()),
            );
        }

        if old.attrs.unique != new.attrs.unique {
            if new.attrs.unique {
                self.add_unique_constraint(diff, table, new);
            } else {
                self.drop_unique_constraint(diff, table, old);
            }
        }

        self.foreign_key_change(diff, table, old, new);
    }

    fn removed_column(&self, diff: &mut TableDiff, table: &str, old: &ColumnMeta) {
        diff.up.push(format!(
            "ALTER TABLE {} DROP COLUMN IF EXISTS {}",
            quote_ident(table),
            quote_ident(&old.column_name)
        ));

        // The reverse reconstructs the column with every attribute it had,
        // as one compound statement so it stays a single down entry.
        let mut down = format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
            quote_ident(table),
            quote_ident(&old.column_name),
            old.attrs.pg_type
        );

        if let Some(default) = &old.attrs.default {
            down.push_str(" DEFAULT ");
            down.push_str(default);
        }
        if old.attrs.not_null || old.attrs.is_pk {
            down.push_str(" NOT NULL");
        }

        if old.attrs.is_pk {
            down.push_str(&format!(
                "; ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(table),
                quote_ident(&pk_constraint_name(table)),
                quote_ident(&old.column_name)
            ));
        }
        if old.attrs.unique {
            let name = constraint_name(old, unique_constraint_name(table, &old.column_name));
            down.push_str("; ");
            down.push_str(&add_constraint_guard(
                &format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                    quote_ident(table),
                    quote_ident(&name),
                    quote_ident(&old.column_name)
                ),
                &name,
            ));
        }
        if let Some(fk) = &old.attrs.foreign_key {
            let name = constraint_name(old, fk_constraint_name(table, &old.column_name));
            down.push_str("; ");
            down.push_str(&add_constraint_guard(
                &add_foreign_key_stmt(table, &name, &old.column_name, fk),
                &name,
            ));
        }

        diff.down.insert(0, down);
    }

    fn add_unique_constraint(&self, diff: &mut TableDiff, table: &str, col: &ColumnMeta) {
        let name = unique_constraint_name(table, &col.column_name);
        let add = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            quote_ident(table),
            quote_ident(&name),
            quote_ident(&col.column_name)
        );
        diff.up.push(add_constraint_guard(&add, &name));
        diff.down.insert(0, drop_constraint_if_exists(table, &name));
    }

    fn drop_unique_constraint(&self, diff: &mut TableDiff, table: &str, col: &ColumnMeta) {
        let name = constraint_name(col, unique_constraint_name(table, &col.column_name));
        diff.up.push(drop_constraint_if_exists(table, &name));
        diff.down.insert(
            0,
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                quote_ident(table),
                quote_ident(&name),
                quote_ident(&col.column_name)
            ),
        );
    }

    fn add_foreign_key(&self, diff: &mut TableDiff, table: &str, column: &str, fk: &ForeignKey) {
        let name = fk_constraint_name(table, column);
        let add = add_foreign_key_stmt(table, &name, column, fk);
        diff.up.push(add_constraint_guard(&add, &name));
        diff.down.insert(0, drop_constraint_if_exists(table, &name));
    }

    /// Any field change in the FK (target table/column or either action) is
    /// a drop-then-add; appearing or disappearing FKs are the degenerate
    /// cases of the same rule.
    fn foreign_key_change(&self, diff: &mut TableDiff, table: &str, old: &ColumnMeta, new: &ColumnMeta) {
        if old.attrs.foreign_key == new.attrs.foreign_key {
            return;
        }

        if let Some(old_fk) = &old.attrs.foreign_key {
            let name = constraint_name(old, fk_constraint_name(table, &old.column_name));
            diff.up.push(drop_constraint_if_exists(table, &name));
            diff.down.insert(
                0,
                add_foreign_key_stmt(table, &name, &old.column_name, old_fk),
            );
        }

        if let Some(new_fk) = &new.attrs.foreign_key {
            self.add_foreign_key(diff, table, &new.column_name, new_fk);
        }
    }

    /// PK composition changed (order-insensitive set comparison): drop the
    /// old constraint and add the new one; the reverse mirrors the pair.
    fn primary_key_change(&self, diff: &mut TableDiff, table: &str, old_pks: &[&str], new_pks: &[&str]) {
        let pk_name = pk_constraint_name(table);

        if !old_pks.is_empty() {
            diff.up.push(drop_constraint_if_exists(table, &pk_name));
            diff.down.insert(
                0,
                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                    quote_ident(table),
                    quote_ident(&pk_name),
                    join_quoted(old_pks)
                ),
            );
        }

        if !new_pks.is_empty() {
            diff.up.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(table),
                quote_ident(&pk_name),
                join_quoted(new_pks)
            ));
            diff.down.insert(0, drop_constraint_if_exists(table, &pk_name));
        }
    }

    fn column_definition(&self, col: &ColumnMeta) -> String {
        let mut def = format!("{} {}", quote_ident(&col.column_name), col.attrs.pg_type);

        if col.attrs.not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &col.attrs.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }

        def
    }
}

/// Quote an identifier, doubling internal double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `<table>_pkey`, matching PostgreSQL's own default.
pub fn pk_constraint_name(table: &str) -> String {
    format!("{}_pkey", table)
}

/// `uc_<table>_<column>`.
pub fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("uc_{}_{}", table, column)
}

/// `fk_<table>_<column>`.
pub fn fk_constraint_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

/// The real catalog name when introspection recorded one, else the synthetic
/// default; DROP must target the constraint that actually exists.
fn constraint_name(col: &ColumnMeta, default_name: String) -> String {
    col.attrs
        .constraint_name
        .clone()
        .unwrap_or(default_name)
}

fn add_foreign_key_stmt(table: &str, name: &str, column: &str, fk: &ForeignKey) -> String {
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE {} ON UPDATE {}",
        quote_ident(table),
        quote_ident(name),
        quote_ident(column),
        quote_ident(&fk.ref_table),
        quote_ident(&fk.ref_column),
        fk.on_delete.as_sql(),
        fk.on_update.as_sql()
    )
}

fn alter_column_type(table: &str, column: &str, pg_type: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
        quote_ident(table),
        quote_ident(column),
        pg_type,
        quote_ident(column),
        pg_type
    )
}

fn alter_column_default(table: &str, column: &str, default: Option<&str>) -> String {
    match default {
        Some(expr) => format!(
            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
            quote_ident(table),
            quote_ident(column),
            expr
        ),
        None => format!(
            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
            quote_ident(table),
            quote_ident(column)
        ),
    }
}

fn drop_not_null(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
        quote_ident(table),
        quote_ident(column)
    )
}

/// `SET NOT NULL` behind a data guard: only fires when the column holds no
/// NULLs, so re-execution and dirty data never abort the migration file.
fn set_not_null_guard(table: &str, column: &str) -> String {
    format!(
        "DO $$ BEGIN\n  IF NOT EXISTS (SELECT 1 FROM {t} WHERE {c} IS NULL) THEN\n    ALTER TABLE {t} ALTER COLUMN {c} SET NOT NULL;\n  END IF;\nEND $$;",
        t = quote_ident(table),
        c = quote_ident(column)
    )
}

/// Wrap an ADD CONSTRAINT in a `pg_constraint` presence check.
fn add_constraint_guard(stmt: &str, constraint: &str) -> String {
    format!(
        "DO $$ BEGIN\n  IF NOT EXISTS (SELECT 1 FROM pg_constraint WHERE conname = '{}') THEN\n    {};\n  END IF;\nEND $$;",
        constraint, stmt
    )
}

fn drop_constraint_if_exists(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
        quote_ident(table),
        quote_ident(constraint)
    )
}

fn join_quoted(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Order-insensitive column-set equality.
fn same_column_set(a: &[&str], b: &[&str]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let set: std::collections::HashSet<&str> = a.iter().copied().collect();
    b.iter().all(|c| set.contains(c))
}
