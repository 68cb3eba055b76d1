//! # strata-postgres
//!
//! PostgreSQL backing for the Strata migration engine.
//!
//! This crate supplies the concrete sides of the trait seams that
//! `strata-migrate` is written against:
//!
//! - [`PgPool`]: a deadpool/tokio-postgres connection pool; also the
//!   [`SqlExecutor`](strata_migrate::SqlExecutor) that runs migration
//!   files.
//! - [`PgIntrospector`]: rebuilds live [`TableSchema`](strata_migrate::TableSchema)
//!   values from `information_schema` and the `pg_catalog` tables.
//! - [`PgLedger`]: the `schema_migrations` table.
//!
//! ```rust,ignore
//! use strata_postgres::{PgIntrospector, PgLedger, PgPool};
//!
//! let pool = PgPool::connect("postgresql://localhost/appdb").await?;
//! let introspector = PgIntrospector::new(pool.clone());
//! let ledger = PgLedger::new(pool.clone());
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod introspect;
pub mod ledger;
pub mod pool;

// Re-exports
pub use config::PgConfig;
pub use connection::PgConnection;
pub use error::{PgError, PgResult};
pub use introspect::PgIntrospector;
pub use ledger::{PgLedger, DEFAULT_LEDGER_TABLE};
pub use pool::PgPool;
