//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata - declarative PostgreSQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Declarative PostgreSQL schema migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to the standard search
    /// locations).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a migration pair from the declared entities
    Generate(GenerateArgs),

    /// Apply pending migrations in order
    Run,

    /// Show applied and pending migrations
    Status,

    /// Revert the last N applied migrations
    Rollback(RollbackArgs),

    /// Create an empty migration file template
    Create(CreateArgs),

    /// Discover entities and print or write them
    Discover(DiscoverArgs),
}

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Migration name; derived from the changed tables when omitted
    pub name: Option<String>,

    /// Plan and report changes without writing files
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `rollback` command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// How many migrations to revert (>= 1)
    pub count: i64,
}

/// Arguments for the `create` command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the migration
    pub name: String,
}

/// Arguments for the `discover` command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Write the discovered entities to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// List what would be discovered without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_with_name_and_dry_run() {
        let cli = Cli::parse_from(["strata", "generate", "add_users", "--dry-run"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.name.as_deref(), Some("add_users"));
        assert!(args.dry_run);
    }

    #[test]
    fn test_rollback_takes_count() {
        let cli = Cli::parse_from(["strata", "rollback", "3"]);
        let Command::Rollback(args) = cli.command else {
            panic!("expected rollback");
        };
        assert_eq!(args.count, 3);
    }

    #[test]
    fn test_discover_output_flag() {
        let cli = Cli::parse_from(["strata", "discover", "-o", "entities.yaml"]);
        let Command::Discover(args) = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(args.output.unwrap().to_str(), Some("entities.yaml"));
    }
}
