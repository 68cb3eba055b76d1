//! `strata rollback <n>` - revert the last N applied migrations.

use strata_migrate::MigrationRunner;

use crate::cli::RollbackArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output;

pub async fn run(args: &RollbackArgs, config: &Config) -> CliResult<()> {
    if args.count < 1 {
        return Err(CliError::usage("N must be ≥ 1"));
    }

    let pool = super::connect(config).await?;
    let runner = MigrationRunner::new(
        super::ledger(config, pool.clone()),
        pool.clone(),
        super::file_manager(config),
    );

    let report = runner.rollback(args.count as usize).await?;

    for name in &report.rolled_back {
        output::list_item(&format!("rolled back {name}"));
    }

    match report.error {
        Some(err) => {
            if !report.rolled_back.is_empty() {
                output::warn(&format!(
                    "{} migration(s) rolled back before the failure",
                    report.rolled_back.len()
                ));
            }
            Err(err.into())
        }
        None => {
            if report.rolled_back.is_empty() {
                output::success("nothing to roll back");
            } else {
                output::success(&format!(
                    "rolled back {} migration(s)",
                    report.rolled_back.len()
                ));
            }
            Ok(())
        }
    }
}
