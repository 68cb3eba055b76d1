//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    #[diagnostic(code(strata::config))]
    Config(String),

    /// Database connection error
    #[error("connection error: {0}")]
    #[diagnostic(code(strata::connect))]
    Connect(String),

    /// Migration engine error
    #[error("{0}")]
    #[diagnostic(code(strata::migration))]
    Migration(#[from] strata_migrate::MigrationError),

    /// Invalid command usage
    #[error("invalid usage: {0}")]
    #[diagnostic(code(strata::usage))]
    Usage(String),
}

impl CliError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

impl From<strata_postgres::PgError> for CliError {
    fn from(err: strata_postgres::PgError) -> Self {
        CliError::Connect(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Config(format!("failed to parse YAML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_display() {
        let err = CliError::usage("N must be ≥ 1");
        assert!(err.to_string().contains("N must be ≥ 1"));
    }

    #[test]
    fn test_migration_error_passthrough() {
        let err: CliError = strata_migrate::MigrationError::UnappliedMigrations.into();
        assert!(err.to_string().contains("unapplied migrations"));
    }
}
