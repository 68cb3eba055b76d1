//! CLI command implementations.

pub mod create;
pub mod discover;
pub mod generate;
pub mod rollback;
pub mod run;
pub mod status;

use strata_migrate::{MigrationFileManager, SchemaRegistry};
use strata_postgres::{PgLedger, PgPool};

use crate::config::Config;
use crate::discovery::{EntityProvider, ManifestProvider};
use crate::error::{CliError, CliResult};

/// Open a pool against the configured DSN and verify the database answers.
pub(crate) async fn connect(config: &Config) -> CliResult<PgPool> {
    if config.database.dsn.is_empty() {
        return Err(CliError::config(
            "database.dsn is not configured; set it in strata.yaml or via DATABASE_DSN",
        ));
    }
    Ok(PgPool::connect(&config.database.dsn).await?)
}

/// File manager over the configured migrations directory.
pub(crate) fn file_manager(config: &Config) -> MigrationFileManager {
    MigrationFileManager::new(&config.migrations.dir)
}

/// Ledger over the configured table name.
pub(crate) fn ledger(config: &Config, pool: PgPool) -> PgLedger {
    PgLedger::with_table(pool, &config.migrations.table_name)
}

/// Build the schema registry from the configured entity manifests.
///
/// Manifests are only pulled in implicitly when `auto_register` is set;
/// otherwise the registry stays empty and entities are expected to be
/// registered programmatically (or inspected through `discover`).
pub(crate) fn load_registry(config: &Config) -> CliResult<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    if !config.auto_register {
        return Ok(registry);
    }

    let paths = config.resolved_entity_paths()?;
    if !paths.is_empty() {
        let entities = ManifestProvider::new().discover(&paths)?;
        for entity in entities {
            registry.register_entity(entity);
        }
    }

    Ok(registry)
}
