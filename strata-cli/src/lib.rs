//! Strata CLI - command-line interface for declarative PostgreSQL schema
//! migrations.
//!
//! Entities are declared in YAML manifests (or registered by embedders),
//! `generate` diffs them against the live database into paired
//! `.up.sql`/`.down.sql` files, and `run`/`rollback`/`status` manage the
//! applied state through the `schema_migrations` ledger.

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod output;
