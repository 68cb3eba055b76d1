//! `strata generate` - plan schema changes and write a migration pair.

use strata_migrate::{GenerateOptions, MigrationPlanner};
use strata_postgres::PgIntrospector;

use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output;

pub async fn run(args: &GenerateArgs, config: &Config) -> CliResult<()> {
    let registry = super::load_registry(config)?;
    if registry.is_empty() {
        if !config.auto_register && !config.entity_paths.is_empty() {
            output::info("entity_paths is set but auto_register is off; set auto_register: true");
        } else {
            output::info("no entities registered; configure entity_paths and auto_register");
        }
    }

    let pool = super::connect(config).await?;
    let planner = MigrationPlanner::new(
        registry,
        PgIntrospector::new(pool.clone()),
        super::ledger(config, pool.clone()),
        super::file_manager(config),
    );

    let opts = GenerateOptions {
        name: args.name.clone(),
        dry_run: args.dry_run,
    };
    let result = planner.generate(&opts).await?;

    if !result.has_changes() {
        output::success("database is up to date; nothing to generate");
        return Ok(());
    }

    output::list(&format!("{} table(s) changed:", result.changes.len()));
    for change in &result.changes {
        output::list_item(&format!(
            "{} [{}] {}",
            change.table, change.change_type, change.details
        ));
    }

    if args.dry_run {
        output::newline();
        output::info("dry run; no files written");
        return Ok(());
    }

    output::newline();
    for file in &result.created_files {
        output::list_item(file);
    }
    output::success("migration generated");
    Ok(())
}
