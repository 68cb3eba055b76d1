//! CLI configuration: YAML file plus environment overlay.
//!
//! The file is searched at `strata.yaml`, `config/strata.yaml`, then
//! `$HOME/.config/strata/config.yaml`; a missing file just means defaults.
//! Every key has a matching environment variable that wins when non-empty.
//! The loaded value is passed into the engine constructors explicitly;
//! there is no process-wide config singleton.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Config file name in the working directory.
pub const CONFIG_FILE_NAME: &str = "strata.yaml";

/// Strata CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration file configuration
    pub migrations: MigrationsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Globs locating entity manifests; `**` recurses.
    pub entity_paths: Vec<String>,

    /// Load discovered entities into the registry automatically on
    /// `generate`.
    pub auto_register: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            migrations: MigrationsConfig::default(),
            logging: LoggingConfig::default(),
            entity_paths: Vec::new(),
            auto_register: false,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL DSN
    pub dsn: String,
}

/// Migration file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Directory holding `.up.sql`/`.down.sql` pairs
    pub dir: String,

    /// Ledger table name
    pub table_name: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: "migrations".to_string(),
            table_name: "schema_migrations".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level: trace, debug, info, warn, error
    pub level: String,

    /// Format: `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: explicit path, else search order, else defaults;
    /// then apply the environment overlay.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read and parse one YAML file.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let mut candidates = vec![
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("config").join(CONFIG_FILE_NAME),
        ];
        if let Ok(home) = std::env::var("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("strata")
                    .join("config.yaml"),
            );
        }

        candidates.into_iter().find(|p| p.is_file())
    }

    /// Non-empty environment variables override their file counterparts.
    fn apply_env(&mut self) {
        if let Some(v) = non_empty_env("DATABASE_DSN") {
            self.database.dsn = v;
        }
        if let Some(v) = non_empty_env("MIGRATIONS_DIR") {
            self.migrations.dir = v;
        }
        if let Some(v) = non_empty_env("MIGRATIONS_TABLE") {
            self.migrations.table_name = v;
        }
        if let Some(v) = non_empty_env("LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = non_empty_env("LOG_FORMAT") {
            self.logging.format = v;
        }
        if let Some(v) = non_empty_env("ENTITY_PATHS") {
            let separator = non_empty_env("ENTITY_PATHS_SEPARATOR").unwrap_or_else(|| ",".into());
            self.entity_paths = v.split(&separator).map(str::to_string).collect();
        }
    }

    /// Expand `entity_paths` globs into concrete files, deduplicated and
    /// in pattern order.
    pub fn resolved_entity_paths(&self) -> CliResult<Vec<PathBuf>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();

        for pattern in &self.entity_paths {
            for path in expand_pattern(pattern)? {
                if seen.insert(path.clone()) {
                    out.push(path);
                }
            }
        }

        Ok(out)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Expand one glob pattern. `**` walks the directory tree rooted at the
/// prefix before the first `**`, skipping hidden and `target` directories;
/// plain patterns match within a single directory level.
fn expand_pattern(pattern: &str) -> CliResult<Vec<PathBuf>> {
    if let Some(star_at) = pattern.find("**") {
        let root = if star_at == 0 { "." } else { pattern[..star_at].trim_end_matches('/') };
        // Collapse every `**` to `*` to get a flat matcher for file names.
        let flat = pattern.replace("**/", "").replace("**", "*");
        let file_glob = flat.rsplit('/').next().unwrap_or(&flat).to_string();

        let mut matches = Vec::new();
        walk(Path::new(root), &file_glob, &mut matches)?;
        matches.sort();
        return Ok(matches);
    }

    let path = Path::new(pattern);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_glob = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::config(format!("invalid entity path pattern: {pattern}")))?;

    let mut matches = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(matches),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && name_matches(&path, file_glob) {
            matches.push(path);
        }
    }
    matches.sort();
    Ok(matches)
}

fn walk(dir: &Path, file_glob: &str, matches: &mut Vec<PathBuf>) -> CliResult<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if path.is_dir() {
            if name.starts_with('.') || name == "target" {
                continue;
            }
            walk(&path, file_glob, matches)?;
        } else if name_matches(&path, file_glob) {
            matches.push(path);
        }
    }

    Ok(())
}

/// Single-segment glob match supporting `*` wildcards.
fn name_matches(path: &Path, glob: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    let mut remaining = name;
    let mut first = true;
    let mut pieces = glob.split('*').peekable();

    while let Some(piece) = pieces.next() {
        let is_last = pieces.peek().is_none();
        if piece.is_empty() {
            first = false;
            continue;
        }
        if first {
            let Some(rest) = remaining.strip_prefix(piece) else {
                return false;
            };
            remaining = rest;
        } else if is_last {
            let Some(rest) = remaining.strip_suffix(piece) else {
                return false;
            };
            remaining = rest;
        } else {
            let Some(at) = remaining.find(piece) else {
                return false;
            };
            remaining = &remaining[at + piece.len()..];
        }
        first = false;
    }

    // With no wildcard at all the whole name must have been consumed;
    // otherwise any leftover text sits under a `*`.
    glob.contains('*') || remaining.is_empty()
}
