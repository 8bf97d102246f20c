//! Patchguard CLI library
//!
//! Argument parsing and settings resolution for the `patchguard` binary,
//! kept separate from `main.rs` so they can be tested.

use clap::{Parser, Subcommand};
use patchguard::{DatabaseConfig, Direction, PatchCatalog, PatcherConfig, Target};
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "patchguard")]
#[command(about = "Step a PostgreSQL schema between numbered patch versions")]
#[command(version)]
pub struct Cli {
    /// Database connection URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Directory holding the patch files
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Leading token of patch file names
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Metadata table holding the recorded version
    #[arg(long, global = true)]
    pub table: Option<String>,

    /// Key of the version row in the metadata table
    #[arg(long, global = true)]
    pub key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move the database to TARGET (a version number or `latest`)
    Migrate {
        target: Target,
    },

    /// Print the recorded version
    Version,

    /// List the patch files found in the patch directory
    List,
}

impl Cli {
    /// `env_logger` filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Apply command-line overrides on top of loaded configuration
    ///
    /// The database URL comes from `--database-url`, then the configuration
    /// (file or `PATCHGUARD__DATABASE__URL`), then `database_url_env`
    /// (normally `DATABASE_URL`), then the built-in default.
    pub fn resolve(&self, mut config: PatcherConfig, database_url_env: Option<String>) -> PatcherConfig {
        let configured = config.database.url != DatabaseConfig::default().url;

        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        } else if let Some(url) = database_url_env.filter(|_| !configured) {
            config.database.url = url;
        }
        if let Some(dir) = &self.dir {
            config.patches.dir = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.patches.prefix = prefix.clone();
        }
        if let Some(table) = &self.table {
            config.patches.table = table.clone();
        }
        if let Some(key) = &self.key {
            config.patches.key = key.clone();
        }

        config
    }
}

/// Human-readable listing of a catalog, one patch per line
pub fn render_catalog(catalog: &PatchCatalog) -> String {
    let mut out = String::new();

    if catalog.is_empty() {
        let _ = writeln!(out, "No patches in {}", catalog.dir().display());
        return out;
    }

    let _ = writeln!(out, "Patches in {} ({}):", catalog.dir().display(), catalog.len());
    for patch in catalog.patches() {
        let arrow = match patch.direction() {
            Direction::Forward => "up  ",
            Direction::Reverse => "down",
        };
        let _ = writeln!(out, "  {arrow} {:>4} -> {:<4} {}", patch.from, patch.to, patch.filename);
    }
    if let Some(latest) = catalog.latest() {
        let _ = writeln!(out, "Latest version: {latest}");
    }

    out
}
