//! Patchguard CLI Tool
//!
//! Applies numbered SQL patch files to a PostgreSQL database, one version at
//! a time, inside a single transaction per run.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use patchguard::connection::redact_connection_string;
use patchguard::{Patcher, PatcherConfig, PgExecutor, Target};
use patchguard_cli::{render_catalog, Cli, Commands};
use std::process;

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter())).init();

    match run(&cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let loaded = PatcherConfig::load().context("Failed to load configuration")?;
    let config = cli.resolve(loaded, std::env::var("DATABASE_URL").ok());
    let patcher = Patcher::new(&config.patches)?;

    match &cli.command {
        Commands::Migrate { target } => handle_migrate(cli, &config, &patcher, *target),
        Commands::Version => handle_version(&config, &patcher),
        Commands::List => handle_list(&patcher),
    }
}

fn connect(config: &PatcherConfig) -> Result<PgExecutor> {
    let url = &config.database.url;
    log::debug!("Connecting to {}", redact_connection_string(url));
    PgExecutor::connect(url)
        .with_context(|| format!("Error connecting to {}", redact_connection_string(url)))
}

fn handle_migrate(cli: &Cli, config: &PatcherConfig, patcher: &Patcher, target: Target) -> Result<()> {
    let target = target.resolve(patcher)?;
    let mut executor = connect(config)?;

    let version = patcher.migrate(&mut executor, target)?;
    if !cli.quiet {
        println!("{} database at patch level {version}", "Success:".green().bold());
    }
    Ok(())
}

fn handle_version(config: &PatcherConfig, patcher: &Patcher) -> Result<()> {
    let store = patcher.version_store();
    log::debug!("Reading key '{}' of table '{}'", store.key(), store.table());

    let executor = connect(config)?;
    let version = patcher.current_version(&executor)?;
    println!("{version}");
    Ok(())
}

fn handle_list(patcher: &Patcher) -> Result<()> {
    let catalog = patcher
        .catalog()
        .with_context(|| format!("Failed to scan {}", patcher.dir().display()))?;
    print!("{}", render_catalog(&catalog));
    Ok(())
}
