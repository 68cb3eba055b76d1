//! # strata-migrate
//!
//! Migration engine for Strata, a declarative PostgreSQL schema-migration
//! tool.
//!
//! This crate provides functionality for:
//! - Building normalized table schemas from entity descriptions
//! - Introspecting the live database shape (through a trait seam)
//! - Diffing declared vs. live schemas into forward/reverse DDL lists
//! - Ordering tables topologically along foreign-key dependencies
//! - Writing paired `.up.sql`/`.down.sql` migration files
//! - Applying and reverting migrations against a ledger table
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ EntityInfo   │────▶│ SchemaBuilder  │──┐  │ Introspector │
//! └──────────────┘     └────────────────┘  │  └──────┬───────┘
//!                                          ▼         ▼
//!                                     ┌─────────────────┐
//!                                     │   Normalizer    │
//!                                     └────────┬────────┘
//!                                              ▼
//!                      ┌────────────┐   ┌─────────────┐
//!                      │ Dep. Order │──▶│ Diff / Plan │──▶ up/down files
//!                      └────────────┘   └─────────────┘
//!                                              │
//!                                              ▼
//!                                     ┌─────────────────┐
//!                                     │ Runner + Ledger │
//!                                     └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{
//!     EntityInfo, FieldInfo, GenerateOptions, MigrationFileManager,
//!     MigrationPlanner, SchemaRegistry,
//! };
//!
//! async fn plan() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = SchemaRegistry::new();
//!     registry.register_entity(EntityInfo {
//!         struct_name: "User".into(),
//!         table_name: "users".into(),
//!         fields: vec![
//!             FieldInfo {
//!                 field_name: "id".into(),
//!                 column_name: String::new(),
//!                 index: 0,
//!                 raw_tag: "id,pk,type=integer".into(),
//!             },
//!             FieldInfo {
//!                 field_name: "email".into(),
//!                 column_name: String::new(),
//!                 index: 1,
//!                 raw_tag: "email,unique".into(),
//!             },
//!         ],
//!     });
//!
//!     let introspector = /* strata_postgres::PgIntrospector */;
//!     let ledger = /* strata_postgres::PgLedger */;
//!     let files = MigrationFileManager::new("migrations");
//!
//!     let planner = MigrationPlanner::new(registry, introspector, ledger, files);
//!     let result = planner.generate(&GenerateOptions::default()).await?;
//!     println!("created {:?}", result.created_files);
//!     Ok(())
//! }
//! ```
//!
//! Every public operation is an `async fn`; dropping the returned future at
//! any await point cancels the operation. The engine performs no internal
//! parallelism and takes no locks: the deployment invariant is a single
//! migration runner per database.

pub mod builder;
pub mod diff;
pub mod error;
pub mod file;
pub mod introspect;
pub mod ledger;
pub mod model;
pub mod normalize;
pub mod order;
pub mod planner;
pub mod runner;

// Re-exports
pub use builder::{build_schema, parse_tag, SchemaRegistry, TableBuilder};
pub use diff::{quote_ident, DiffGenerator};
pub use error::{MigrateResult, MigrationError};
pub use file::{wrap_transaction, MigrationFileManager};
pub use introspect::SchemaIntrospector;
pub use ledger::{MigrationLedger, SqlExecutor};
pub use model::{
    ColumnAttributes, ColumnMeta, EntityInfo, FieldInfo, ForeignKey, ReferentialAction,
    TableDiff, TableSchema,
};
pub use normalize::normalize_schema;
pub use order::{build_graph, topological_sort, DependencyGraph};
pub use planner::{
    ChangeType, GenerateOptions, GenerateResult, MigrationPlanner, TableChange,
};
pub use runner::{ApplyReport, MigrationRunner, RollbackReport, StatusReport};
