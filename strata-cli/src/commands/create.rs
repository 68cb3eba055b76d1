//! `strata create <name>` - write an empty migration template.

use crate::cli::CreateArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output;

pub async fn run(args: &CreateArgs, config: &Config) -> CliResult<()> {
    let files = super::file_manager(config);
    let path = files.write_template(&args.name).await?;

    output::success(&format!("created {}", path.display()));
    Ok(())
}
