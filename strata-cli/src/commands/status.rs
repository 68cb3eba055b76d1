//! `strata status` - list applied and pending migrations.

use strata_migrate::MigrationRunner;

use crate::config::Config;
use crate::error::CliResult;
use crate::output;

pub async fn run(config: &Config) -> CliResult<()> {
    let pool = super::connect(config).await?;
    let runner = MigrationRunner::new(
        super::ledger(config, pool.clone()),
        pool.clone(),
        super::file_manager(config),
    );

    let status = runner.status().await?;

    output::section("Applied:");
    for name in &status.applied {
        println!("{}", output::style_applied(name));
    }

    output::section("Pending:");
    for name in &status.pending {
        println!("{}", output::style_pending(name));
    }

    Ok(())
}
