//! End-to-end planning scenarios: registry in, migration files out.
//!
//! The live database is simulated with an in-memory introspector and
//! ledger so the scenarios exercise the full planner pipeline: builder,
//! normalizer, dependency ordering, diffing, naming, file writing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use strata_migrate::{
    EntityInfo, FieldInfo, GenerateOptions, MigrateResult, MigrationError, MigrationFileManager,
    MigrationLedger, MigrationPlanner, SchemaIntrospector, SchemaRegistry, TableSchema,
};

#[derive(Default)]
struct MemoryIntrospector {
    schemas: HashMap<String, TableSchema>,
}

#[async_trait]
impl SchemaIntrospector for MemoryIntrospector {
    async fn table_schema(&self, table: &str) -> MigrateResult<TableSchema> {
        Ok(self.schemas.get(table).cloned().unwrap_or(TableSchema {
            table_name: table.to_string(),
            columns: Vec::new(),
        }))
    }
}

#[derive(Default)]
struct MemoryLedger {
    rows: Mutex<Vec<String>>,
}

impl MemoryLedger {
    fn with_rows(rows: &[&str]) -> Self {
        Self {
            rows: Mutex::new(rows.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[async_trait]
impl MigrationLedger for MemoryLedger {
    async fn initialize(&self) -> MigrateResult<()> {
        Ok(())
    }

    async fn applied(&self) -> MigrateResult<Vec<String>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn record(&self, name: &str) -> MigrateResult<()> {
        self.rows.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn remove(&self, name: &str) -> MigrateResult<()> {
        self.rows.lock().unwrap().retain(|n| n != name);
        Ok(())
    }
}

fn entity(struct_name: &str, table: &str, fields: &[(&str, &str)]) -> EntityInfo {
    EntityInfo {
        struct_name: struct_name.to_string(),
        table_name: table.to_string(),
        fields: fields
            .iter()
            .enumerate()
            .map(|(i, (name, tag))| FieldInfo {
                field_name: name.to_string(),
                column_name: String::new(),
                index: i,
                raw_tag: tag.to_string(),
            })
            .collect(),
    }
}

fn planner_in(
    dir: &TempDir,
    registry: SchemaRegistry,
    introspector: MemoryIntrospector,
    ledger: MemoryLedger,
) -> MigrationPlanner<MemoryIntrospector, MemoryLedger> {
    MigrationPlanner::new(
        registry,
        introspector,
        ledger,
        MigrationFileManager::new(dir.path()),
    )
}

async fn read_pair(dir: &TempDir, files: &[String]) -> (String, String) {
    let up_name = files.iter().find(|f| f.ends_with(".up.sql")).unwrap();
    let down_name = files.iter().find(|f| f.ends_with(".down.sql")).unwrap();
    let up = tokio::fs::read_to_string(dir.path().join(up_name)).await.unwrap();
    let down = tokio::fs::read_to_string(dir.path().join(down_name)).await.unwrap();
    (up, down)
}

#[tokio::test]
async fn first_ever_create_emits_full_table() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity(
        "User",
        "users",
        &[
            ("Id", "id,pk,type=integer"),
            ("Email", "email,unique"),
            ("CreatedAt", "created_at,type=timestamptz,default=now(),notnull"),
        ],
    ));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let result = planner.generate(&GenerateOptions::default()).await.unwrap();

    assert_eq!(result.created_files.len(), 2);
    assert_eq!(result.changes.len(), 1);
    assert_eq!(result.changes[0].change_type.to_string(), "create_table");

    let (up, down) = read_pair(&dir, &result.created_files).await;
    assert!(up.starts_with("BEGIN;\n"));
    assert!(up.trim_end().ends_with("COMMIT;"));
    assert!(up.contains("CREATE TABLE IF NOT EXISTS \"users\" ("));
    assert!(up.contains("CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\")"));
    assert!(up.contains("CONSTRAINT \"uc_users_email\" UNIQUE (\"email\")"));
    assert!(down.contains("DROP TABLE IF EXISTS \"users\" CASCADE"));
}

#[tokio::test]
async fn foreign_key_orders_referenced_table_first() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("Author", "authors", &[("Id", "id,pk,type=integer")]));
    registry.register_entity(entity(
        "Book",
        "books",
        &[
            ("Id", "id,pk,type=integer"),
            ("AuthorId", "author_id,type=integer,fk=authors.id,delete=cascade"),
        ],
    ));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let result = planner.generate(&GenerateOptions::default()).await.unwrap();

    let (up, down) = read_pair(&dir, &result.created_files).await;

    let authors_at = up.find("-- Changes for table: authors").unwrap();
    let books_at = up.find("-- Changes for table: books").unwrap();
    assert!(authors_at < books_at, "authors must be created before books");

    assert!(up.contains(
        "ADD CONSTRAINT \"fk_books_author_id\" FOREIGN KEY (\"author_id\") REFERENCES \"authors\"(\"id\") ON DELETE CASCADE ON UPDATE NO ACTION"
    ));
    assert!(up.contains("conname = 'fk_books_author_id'"));

    // Down file reverts in reverse table order: books before authors.
    let books_rev = down.find("-- Revert changes for table: books").unwrap();
    let authors_rev = down.find("-- Revert changes for table: authors").unwrap();
    assert!(books_rev < authors_rev);

    // And within books, the FK drop precedes the table drop.
    let fk_drop = down.find("DROP CONSTRAINT IF EXISTS \"fk_books_author_id\"").unwrap();
    let table_drop = down.find("DROP TABLE IF EXISTS \"books\" CASCADE").unwrap();
    assert!(fk_drop < table_drop);
}

#[tokio::test]
async fn self_referential_fk_plans_without_cycle() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity(
        "Category",
        "categories",
        &[
            ("Id", "id,pk,type=integer"),
            ("ParentId", "parent_id,type=integer,fk=categories.id"),
        ],
    ));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let result = planner.generate(&GenerateOptions::default()).await.unwrap();

    let (up, _) = read_pair(&dir, &result.created_files).await;
    let create_at = up.find("CREATE TABLE IF NOT EXISTS \"categories\"").unwrap();
    let fk_at = up.find("FOREIGN KEY").unwrap();
    assert!(create_at < fk_at, "FK must come after the CREATE as an ALTER");
    assert!(up.contains("ADD CONSTRAINT \"fk_categories_parent_id\""));
}

#[tokio::test]
async fn cyclic_foreign_keys_fail_without_writing_files() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity(
        "A",
        "a",
        &[("Id", "id,pk,type=integer"), ("BId", "b_id,type=integer,fk=b.id")],
    ));
    registry.register_entity(entity(
        "B",
        "b",
        &[("Id", "id,pk,type=integer"), ("AId", "a_id,type=integer,fk=a.id")],
    ));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let err = planner.generate(&GenerateOptions::default()).await.unwrap_err();

    let MigrationError::CyclicDependency(listing) = err else {
        panic!("expected cycle error");
    };
    assert!(listing.contains('a') && listing.contains('b'));

    let files = MigrationFileManager::new(dir.path()).list_sql_files().await.unwrap();
    assert!(files.is_empty(), "no files may be written on cycle");
}

#[tokio::test]
async fn empty_registry_produces_empty_plan() {
    let dir = TempDir::new().unwrap();
    let planner = planner_in(
        &dir,
        SchemaRegistry::new(),
        MemoryIntrospector::default(),
        MemoryLedger::default(),
    );

    let result = planner.generate(&GenerateOptions::default()).await.unwrap();
    assert!(result.created_files.is_empty());
    assert!(!result.has_changes());
}

#[tokio::test]
async fn matching_schemas_produce_no_files() {
    let dir = TempDir::new().unwrap();

    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("User", "users", &[("Id", "id,pk,type=integer")]));

    // Live database already matches the declaration.
    let declared = strata_migrate::build_schema(&entity(
        "User",
        "users",
        &[("Id", "id,pk,type=integer")],
    ));
    let mut introspector = MemoryIntrospector::default();
    introspector.schemas.insert("users".to_string(), declared);

    let planner = planner_in(&dir, registry, introspector, MemoryLedger::default());
    let result = planner.generate(&GenerateOptions::default()).await.unwrap();

    assert!(result.created_files.is_empty());
    assert!(result.changes.is_empty());
}

#[tokio::test]
async fn unapplied_migration_blocks_generate() {
    let dir = TempDir::new().unwrap();
    let files = MigrationFileManager::new(dir.path());
    files
        .write_pair("20240101000000__seed__aaaa", "BEGIN;\nCOMMIT;\n", "BEGIN;\nCOMMIT;\n")
        .await
        .unwrap();

    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("User", "users", &[("Id", "id,pk,type=integer")]));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let err = planner.generate(&GenerateOptions::default()).await.unwrap_err();
    assert!(matches!(err, MigrationError::UnappliedMigrations));

    // Only the pre-existing pair remains on disk.
    let listed = files.list_sql_files().await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn dry_run_reports_changes_without_files() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("User", "users", &[("Id", "id,pk,type=integer")]));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let opts = GenerateOptions {
        name: None,
        dry_run: true,
    };
    let result = planner.generate(&opts).await.unwrap();

    assert!(result.created_files.is_empty());
    assert_eq!(result.changes.len(), 1);
    assert!(MigrationFileManager::new(dir.path())
        .list_sql_files()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn custom_name_lands_in_file_name() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("User", "users", &[("Id", "id,pk,type=integer")]));

    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), MemoryLedger::default());
    let opts = GenerateOptions {
        name: Some("Initial Schema".to_string()),
        dry_run: false,
    };
    let result = planner.generate(&opts).await.unwrap();

    assert!(result.created_files[0].contains("__initial_schema__"));
}

#[tokio::test]
async fn generate_allowed_after_previous_applied() {
    let dir = TempDir::new().unwrap();
    let files = MigrationFileManager::new(dir.path());
    files
        .write_pair("20240101000000__seed__aaaa", "BEGIN;\nCOMMIT;\n", "BEGIN;\nCOMMIT;\n")
        .await
        .unwrap();

    let mut registry = SchemaRegistry::new();
    registry.register_entity(entity("User", "users", &[("Id", "id,pk,type=integer")]));

    let ledger = MemoryLedger::with_rows(&["20240101000000__seed__aaaa"]);
    let planner = planner_in(&dir, registry, MemoryIntrospector::default(), ledger);
    let result = planner.generate(&GenerateOptions::default()).await.unwrap();
    assert_eq!(result.created_files.len(), 2);
}
