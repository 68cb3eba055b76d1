//! Migration file management.
//!
//! Migrations live flat in one directory as paired files:
//!
//! ```text
//! migrations/
//! ├── 20240301120000__create_users__a1b2.up.sql
//! ├── 20240301120000__create_users__a1b2.down.sql
//! └── 20240302093000__update_posts__c3d4.up.sql
//! ```
//!
//! The base name is `<YYYYMMDDhhmmss>__<slug>__<4-hex-random>`; because the
//! UTC timestamp leads, lexicographic file order equals chronological order.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rand::RngCore;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// Suffix of forward migration files.
pub const UP_SUFFIX: &str = ".up.sql";
/// Suffix of reverse migration files.
pub const DOWN_SUFFIX: &str = ".down.sql";

/// Template content for `create`-command skeleton migrations.
pub const TEMPLATE: &str = "-- +migrate Up\n\n-- +migrate Down\n";

/// Reader/writer for the migrations directory.
#[derive(Debug, Clone)]
pub struct MigrationFileManager {
    migrations_dir: PathBuf,
}

impl MigrationFileManager {
    /// Create a new file manager rooted at `migrations_dir`.
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    /// The migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Ensure the migrations directory exists.
    pub async fn ensure_dir(&self) -> MigrateResult<()> {
        tokio::fs::create_dir_all(&self.migrations_dir)
            .await
            .map_err(MigrationError::Io)?;
        Ok(())
    }

    /// All `*.sql` file names, lexicographically sorted. A missing
    /// directory reads as empty.
    pub async fn list_sql_files(&self) -> MigrateResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.migrations_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MigrationError::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(MigrationError::Io)? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(".sql") {
                    files.push(name.to_string());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Base names of all up-files, in file (= chronological) order.
    pub async fn list_up_bases(&self) -> MigrateResult<Vec<String>> {
        Ok(self
            .list_sql_files()
            .await?
            .iter()
            .filter_map(|f| f.strip_suffix(UP_SUFFIX))
            .map(String::from)
            .collect())
    }

    /// Read the up-file for a base name.
    pub async fn read_up(&self, base: &str) -> MigrateResult<String> {
        let path = self.migrations_dir.join(format!("{base}{UP_SUFFIX}"));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(MigrationError::Io)
    }

    /// Whether a down-file exists for a base name.
    pub fn down_exists(&self, base: &str) -> bool {
        self.migrations_dir
            .join(format!("{base}{DOWN_SUFFIX}"))
            .is_file()
    }

    /// Read the down-file for a base name.
    pub async fn read_down(&self, base: &str) -> MigrateResult<String> {
        let path = self.migrations_dir.join(format!("{base}{DOWN_SUFFIX}"));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(MigrationError::Io)
    }

    /// Write an up/down file pair. If the down write fails, the freshly
    /// written up-file is unlinked so no half pair remains.
    pub async fn write_pair(
        &self,
        base: &str,
        up_content: &str,
        down_content: &str,
    ) -> MigrateResult<Vec<String>> {
        self.ensure_dir().await?;

        let up_name = format!("{base}{UP_SUFFIX}");
        let down_name = format!("{base}{DOWN_SUFFIX}");
        let up_path = self.migrations_dir.join(&up_name);
        let down_path = self.migrations_dir.join(&down_name);

        tokio::fs::write(&up_path, up_content)
            .await
            .map_err(MigrationError::Io)?;

        if let Err(e) = tokio::fs::write(&down_path, down_content).await {
            let _ = tokio::fs::remove_file(&up_path).await;
            return Err(MigrationError::Io(e));
        }

        debug!(base = %base, dir = %self.migrations_dir.display(), "wrote migration pair");
        Ok(vec![up_name, down_name])
    }

    /// Write an empty skeleton migration (`<ts>__<slug>.sql`) with
    /// up/down markers for hand-written SQL.
    pub async fn write_template(&self, name: &str) -> MigrateResult<PathBuf> {
        self.ensure_dir().await?;

        let file = format!("{}__{}.sql", timestamp(), normalize_slug(name));
        let path = self.migrations_dir.join(file);
        tokio::fs::write(&path, TEMPLATE)
            .await
            .map_err(MigrationError::Io)?;
        Ok(path)
    }

    /// Produce a fresh base name from an optional user slug and the set of
    /// changed tables. The 4-hex suffix keeps names unique within a second.
    pub fn generate_base_name(&self, custom: Option<&str>, changed_tables: &[String]) -> String {
        let slug = match custom {
            Some(name) => normalize_slug(name),
            None => auto_slug(changed_tables),
        };
        format!("{}__{}__{}", timestamp(), slug, random_hex(2))
    }
}

/// UTC wall-clock in `YYYYMMDDhhmmss`.
fn timestamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// `n` random bytes rendered as lowercase hex (2 chars per byte).
fn random_hex(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Normalize a slug to lowercase `[a-z0-9_]`, with runs of `_` collapsed,
/// trimmed to at most 50 chars, and stripped of leading/trailing `_`.
pub fn normalize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_underscore = false;

    for ch in name.to_lowercase().chars() {
        let mapped = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if mapped == '_' {
            if last_underscore {
                continue;
            }
            last_underscore = true;
        } else {
            last_underscore = false;
        }
        slug.push(mapped);
    }

    if slug.len() > 50 {
        slug.truncate(50);
    }
    slug.trim_matches('_').to_string()
}

/// Derive a slug from the changed tables when the user supplied none.
fn auto_slug(changed_tables: &[String]) -> String {
    match changed_tables.len() {
        0 => "no_changes".to_string(),
        1 => format!("update_{}", normalize_slug(&changed_tables[0])),
        2..=3 => {
            let names: Vec<String> = changed_tables.iter().map(|t| normalize_slug(t)).collect();
            format!("update_{}_tables", names.join("_"))
        }
        n => format!("update_{n}_tables"),
    }
}

/// Wrap a statement list in a single top-level transaction.
///
/// Comment lines pass through untouched; other statements get a trailing
/// `;` when they lack one; empty entries become blank separator lines.
/// An empty list produces empty content.
pub fn wrap_transaction(statements: &[String]) -> String {
    if statements.iter().all(|s| s.is_empty()) {
        return String::new();
    }

    let mut body = String::new();
    for stmt in statements {
        if stmt.is_empty() {
            body.push('\n');
        } else if stmt.starts_with("--") || stmt.ends_with(';') {
            body.push_str(stmt);
            body.push('\n');
        } else {
            body.push_str(stmt);
            body.push_str(";\n");
        }
    }

    format!("BEGIN;\n\n{}\n\nCOMMIT;\n", body.trim_end())
}
