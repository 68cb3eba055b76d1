//! `strata discover` - collect entity descriptions from the configured
//! manifests and print or write them as one merged manifest.

use crate::cli::DiscoverArgs;
use crate::config::Config;
use crate::discovery::{EntityManifest, EntityProvider, ManifestProvider};
use crate::error::{CliError, CliResult};
use crate::output;

pub async fn run(args: &DiscoverArgs, config: &Config) -> CliResult<()> {
    let paths = config.resolved_entity_paths()?;
    if paths.is_empty() {
        return Err(CliError::config(
            "entity_paths is not configured or matches no files",
        ));
    }

    let entities = ManifestProvider::new().discover(&paths)?;

    if args.dry_run {
        output::list(&format!("{} entit(ies) found:", entities.len()));
        for entity in &entities {
            output::list_item(&format!(
                "{} -> {} ({} fields)",
                entity.struct_name,
                entity.table_name,
                entity.fields.len()
            ));
        }
        return Ok(());
    }

    let manifest = EntityManifest { entities };
    let rendered = serde_yaml::to_string(&manifest)
        .map_err(|e| CliError::config(format!("failed to render entities: {e}")))?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            output::success(&format!("wrote {}", path.display()));
        }
        None => print!("{rendered}"),
    }

    Ok(())
}
