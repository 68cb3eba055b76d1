//! Entity discovery.
//!
//! The engine consumes [`EntityInfo`] values and does not care where they
//! come from. Rust has no runtime reflection to walk annotated structs, so
//! the built-in collaborator reads declarative YAML manifests located by
//! the `entity_paths` globs:
//!
//! ```yaml
//! entities:
//!   - struct_name: User
//!     table_name: users
//!     fields:
//!       - field_name: id
//!         tag: "id,pk,type=integer"
//!       - field_name: email
//!         tag: "email,unique"
//! ```
//!
//! Embedders with another source of truth can skip manifests entirely and
//! register entities on a [`SchemaRegistry`](strata_migrate::SchemaRegistry)
//! through their own [`EntityProvider`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use strata_migrate::{EntityInfo, MigrateResult, MigrationError};

/// A source of entity descriptions.
pub trait EntityProvider {
    /// Produce the entities found at the given paths.
    fn discover(&self, paths: &[PathBuf]) -> MigrateResult<Vec<EntityInfo>>;
}

/// Top-level shape of an entity manifest file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EntityManifest {
    #[serde(default)]
    pub entities: Vec<EntityInfo>,
}

/// Discovery over YAML entity manifests.
#[derive(Debug, Default)]
pub struct ManifestProvider;

impl ManifestProvider {
    pub fn new() -> Self {
        Self
    }

    fn read_manifest(&self, path: &Path) -> MigrateResult<Vec<EntityInfo>> {
        let content = std::fs::read_to_string(path).map_err(MigrationError::Io)?;
        let manifest: EntityManifest = serde_yaml::from_str(&content).map_err(|e| {
            MigrationError::discovery(format!("invalid manifest {}: {e}", path.display()))
        })?;
        Ok(manifest.entities)
    }
}

impl EntityProvider for ManifestProvider {
    fn discover(&self, paths: &[PathBuf]) -> MigrateResult<Vec<EntityInfo>> {
        let mut entities = Vec::new();
        let mut seen_tables = std::collections::HashSet::new();

        for path in paths {
            for entity in self.read_manifest(path)? {
                if entity.table_name.is_empty() {
                    return Err(MigrationError::discovery(format!(
                        "entity '{}' in {} has no table_name",
                        entity.struct_name,
                        path.display()
                    )));
                }
                if !seen_tables.insert(entity.table_name.clone()) {
                    return Err(MigrationError::discovery(format!(
                        "table '{}' is declared more than once",
                        entity.table_name
                    )));
                }
                entities.push(entity);
            }
        }

        Ok(entities)
    }
}
