//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation error.
    #[error("database error: {0}")]
    Database(String),

    /// Catalog introspection error for an existing table.
    #[error("introspection error: {0}")]
    Introspection(String),

    /// Foreign keys form a cycle; carries the dependency listing.
    #[error("cyclic dependency detected in foreign keys\n{0}")]
    CyclicDependency(String),

    /// Generate was invoked while pending up-files exist.
    #[error("there are unapplied migrations; run `strata run` before generating new migrations")]
    UnappliedMigrations,

    /// Rollback target has no down-file on disk.
    #[error("down file not found for migration '{0}'")]
    MissingDownFile(String),

    /// Rollback target's down-file is whitespace-only.
    #[error("migration '{0}' has an empty down file")]
    EmptyDownFile(String),

    /// Invalid migration file, name, or request.
    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    /// Entity discovery failure.
    #[error("discovery error: {0}")]
    Discovery(String),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an introspection error.
    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }

    /// Create an invalid-migration error.
    pub fn invalid_migration(msg: impl Into<String>) -> Self {
        Self::InvalidMigration(msg.into())
    }

    /// Create a discovery error.
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Whether the failure left the database untouched for the current step.
    ///
    /// Precondition and lookup failures are safe to retry after fixing the
    /// cause; `Database` failures may have partially applied a file and need
    /// inspection first.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnappliedMigrations | Self::MissingDownFile(_) | Self::EmptyDownFile(_)
        )
    }
}
