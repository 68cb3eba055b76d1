//! Tracing subscriber initialization.
//!
//! Logs go to stderr so generated SQL and status listings on stdout stay
//! pipeable. Level and format come from the resolved configuration
//! (`logging.level` / `logging.format`, overridable through `LOG_LEVEL` /
//! `LOG_FORMAT`).

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber once, before any command runs.
pub fn init(config: &LoggingConfig) {
    let level = config.level.as_str();
    let filter = EnvFilter::try_new(format!(
        "strata={level},strata_migrate={level},strata_postgres={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .json()
                .init();
        }
        _ => {
            // Plain text is the default.
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
        }
    }
}
