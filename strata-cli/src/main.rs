//! Strata CLI - declarative PostgreSQL schema migrations.

use clap::Parser;

use strata_cli::cli::{Cli, Command};
use strata_cli::config::Config;
use strata_cli::error::CliResult;
use strata_cli::{commands, logging, output};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.logging);

    match &cli.command {
        Command::Generate(args) => commands::generate::run(args, &config).await,
        Command::Run => commands::run::run(&config).await,
        Command::Status => commands::status::run(&config).await,
        Command::Rollback(args) => commands::rollback::run(args, &config).await,
        Command::Create(args) => commands::create::run(args, &config).await,
        Command::Discover(args) => commands::discover::run(args, &config).await,
    }
}
