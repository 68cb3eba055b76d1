//! `strata run` - apply pending migrations in order.

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

    let report = runner.run().await?;

    for name in &report.applied {
        output::list_item(&format!("applied {name}"));
    }

    match report.error {
        Some(err) => {
            if !report.applied.is_empty() {
                output::warn(&format!(
                    "{} migration(s) applied before the failure",
                    report.applied.len()
                ));
            }
            Err(err.into())
        }
        None => {
            if report.applied.is_empty() {
                output::success("nothing to apply");
            } else {
                output::success(&format!("applied {} migration(s)", report.applied.len()));
            }
            Ok(())
        }
    }
}
