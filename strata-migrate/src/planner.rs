//! Migration planning: declared schemas vs. live database, to files.
//!
//! The planner orchestrates the whole generate pipeline: it refuses to run
//! while unapplied up-files exist, builds declared schemas from the
//! registry, introspects the live database, orders tables by foreign-key
//! dependencies, diffs each table, and assembles one up-file and one
//! reverse-ordered down-file wrapped in a single transaction each.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::builder::SchemaRegistry;
use crate::diff::DiffGenerator;
use crate::error::{MigrateResult, MigrationError};
use crate::file::{wrap_transaction, MigrationFileManager};
use crate::introspect::SchemaIntrospector;
use crate::ledger::MigrationLedger;
use crate::model::TableSchema;
use crate::normalize::normalize_schema;
use crate::order::{build_graph, topological_sort};

/// Options for one generate invocation.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// User-supplied migration slug; auto-derived from the changed tables
    /// when absent.
    pub name: Option<String>,
    /// Plan only: report changes without writing files.
    pub dry_run: bool,
}

/// Result of a generate invocation.
#[derive(Debug, Default)]
pub struct GenerateResult {
    /// File names written (empty on dry-run or when nothing changed).
    pub created_files: Vec<String>,
    /// Per-table change summaries, in plan order.
    pub changes: Vec<TableChange>,
}

impl GenerateResult {
    /// Whether the plan found any difference.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// One table's contribution to the plan.
#[derive(Debug, Clone)]
pub struct TableChange {
    pub table: String,
    pub change_type: ChangeType,
    pub details: String,
}

/// Coarse classification of what happened to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    CreateTable,
    DropTable,
    AddColumns,
    DropColumns,
    ModifyColumns,
    AlterConstraints,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateTable => "create_table",
            Self::DropTable => "drop_table",
            Self::AddColumns => "add_columns",
            Self::DropColumns => "drop_columns",
            Self::ModifyColumns => "modify_columns",
            Self::AlterConstraints => "alter_constraints",
        };
        f.write_str(s)
    }
}

/// Plans and writes migrations.
pub struct MigrationPlanner<I, L> {
    registry: SchemaRegistry,
    introspector: I,
    ledger: L,
    files: MigrationFileManager,
    differ: DiffGenerator,
}

impl<I, L> MigrationPlanner<I, L>
where
    I: SchemaIntrospector,
    L: MigrationLedger,
{
    /// Create a planner over a registry, an introspector, a ledger, and a
    /// migrations directory.
    pub fn new(
        registry: SchemaRegistry,
        introspector: I,
        ledger: L,
        files: MigrationFileManager,
    ) -> Self {
        Self {
            registry,
            introspector,
            ledger,
            files,
            differ: DiffGenerator::new(),
        }
    }

    /// Generate a migration pair from the registered entities.
    ///
    /// Fails with [`MigrationError::UnappliedMigrations`] when any up-file
    /// on disk has no ledger row: apply-before-generate keeps histories
    /// linear.
    pub async fn generate(&self, opts: &GenerateOptions) -> MigrateResult<GenerateResult> {
        if self.has_unapplied_migrations().await? {
            return Err(MigrationError::UnappliedMigrations);
        }

        self.files.ensure_dir().await?;

        let new_schemas = self.registry.build_all();
        if new_schemas.is_empty() {
            info!("no tables registered; nothing to plan");
            return Ok(GenerateResult::default());
        }

        let old_schemas = self.fetch_old_schemas(&new_schemas).await;

        let graph = build_graph(&new_schemas);
        let table_names: Vec<String> = new_schemas.keys().cloned().collect();
        let sorted = topological_sort(&graph, &table_names)?;

        let mut changes = Vec::new();
        let mut up_statements: Vec<String> = Vec::new();
        let mut down_statements: Vec<String> = Vec::new();

        for table in &sorted {
            let old = normalize_schema(&old_schemas[table]);
            let new = normalize_schema(&new_schemas[table]);

            let diff = self.differ.diff(&old, &new);
            if diff.is_empty() {
                continue;
            }

            debug!(table = %table, up = diff.up.len(), down = diff.down.len(), "table diff");
            changes.push(TableChange {
                table: table.clone(),
                change_type: classify_change(&old, &new),
                details: format!("{} changes", diff.up.len()),
            });

            up_statements.push(format!("-- Changes for table: {table}"));
            up_statements.extend(diff.up);
            up_statements.push(String::new());

            // Prepend the whole block so the down file reverts tables in
            // reverse creation order.
            let mut block = vec![format!("-- Revert changes for table: {table}")];
            block.extend(diff.down);
            block.push(String::new());
            block.append(&mut down_statements);
            down_statements = block;
        }

        if up_statements.is_empty() {
            info!("schemas match the database; no migration generated");
            return Ok(GenerateResult {
                created_files: Vec::new(),
                changes,
            });
        }

        if opts.dry_run {
            return Ok(GenerateResult {
                created_files: Vec::new(),
                changes,
            });
        }

        let changed_tables: Vec<String> = changes.iter().map(|c| c.table.clone()).collect();
        let base = self
            .files
            .generate_base_name(opts.name.as_deref(), &changed_tables);

        let created_files = self
            .files
            .write_pair(
                &base,
                &wrap_transaction(&up_statements),
                &wrap_transaction(&down_statements),
            )
            .await?;

        info!(base = %base, tables = changes.len(), "generated migration");
        Ok(GenerateResult {
            created_files,
            changes,
        })
    }

    /// Fetch live schemas for every declared table, treating fetch errors
    /// as "table does not exist" after logging them.
    async fn fetch_old_schemas(
        &self,
        new_schemas: &BTreeMap<String, TableSchema>,
    ) -> BTreeMap<String, TableSchema> {
        let mut old_schemas = BTreeMap::new();

        for table in new_schemas.keys() {
            let old = match self.introspector.table_schema(table).await {
                Ok(schema) => schema,
                Err(e) => {
                    warn!(table = %table, error = %e, "schema fetch failed; treating as new table");
                    TableSchema {
                        table_name: table.clone(),
                        columns: Vec::new(),
                    }
                }
            };
            old_schemas.insert(table.clone(), old);
        }

        old_schemas
    }

    async fn has_unapplied_migrations(&self) -> MigrateResult<bool> {
        let applied = self.ledger.applied().await?;
        let bases = self.files.list_up_bases().await?;

        let applied_set: std::collections::HashSet<&str> =
            applied.iter().map(String::as_str).collect();
        Ok(bases.iter().any(|b| !applied_set.contains(b.as_str())))
    }
}

/// First matching rule wins: create, drop, added columns, dropped columns,
/// type changes, constraint-count changes, otherwise a column modification.
fn classify_change(old: &TableSchema, new: &TableSchema) -> ChangeType {
    if old.columns.is_empty() && !new.columns.is_empty() {
        return ChangeType::CreateTable;
    }
    if !old.columns.is_empty() && new.columns.is_empty() {
        return ChangeType::DropTable;
    }
    if new.columns.iter().any(|c| old.column(&c.column_name).is_none()) {
        return ChangeType::AddColumns;
    }
    if old.columns.iter().any(|c| new.column(&c.column_name).is_none()) {
        return ChangeType::DropColumns;
    }
    if new.columns.iter().any(|c| {
        old.column(&c.column_name)
            .is_some_and(|o| o.attrs.pg_type != c.attrs.pg_type)
    }) {
        return ChangeType::ModifyColumns;
    }
    if count_constraints(old) != count_constraints(new) {
        return ChangeType::AlterConstraints;
    }
    ChangeType::ModifyColumns
}

fn count_constraints(schema: &TableSchema) -> usize {
    schema
        .columns
        .iter()
        .filter(|c| c.attrs.unique || c.attrs.is_pk || c.attrs.foreign_key.is_some())
        .count()
}
