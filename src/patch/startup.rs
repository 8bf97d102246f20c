//! In-process patching helpers

use crate::config::PatcherConfig;
use crate::executor::PgExecutor;
use crate::patch::error::PatchError;
use crate::patch::record::SchemaVersion;
use crate::patch::runner::Patcher;
use std::fmt;
use std::str::FromStr;

/// Version a run should end at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Version(SchemaVersion),
    /// Highest destination among the forward patches (0 if there are none)
    Latest,
}

impl Target {
    /// Concrete version for this target
    ///
    /// # Errors
    ///
    /// `Latest` scans the patch directory; see [`Patcher::catalog`].
    pub fn resolve(self, patcher: &Patcher) -> Result<SchemaVersion, PatchError> {
        match self {
            Target::Version(version) => Ok(version),
            Target::Latest => Ok(patcher.catalog()?.latest().unwrap_or(0)),
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Target::Latest);
        }
        s.parse()
            .map(Target::Version)
            .map_err(|_| format!("'{s}' is neither a version number nor 'latest'"))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Version(version) => write!(f, "{version}"),
            Target::Latest => f.write_str("latest"),
        }
    }
}

/// Patch the configured database on application startup
///
/// Connects with `config.database.url`, then runs one all-or-nothing
/// migration to `target`. Meant to be called before the application starts
/// serving; a failure should stop startup.
///
/// # Example
///
/// ```rust,no_run
/// use patchguard::{PatcherConfig, startup::{migrate_from_config, Target}};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PatcherConfig::load()?;
///     let version = migrate_from_config(&config, Target::Latest)?;
///     println!("database at patch level {version}");
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - `PatchError::Connection` if the database cannot be reached
/// - any error from [`Patcher::migrate`]
pub fn migrate_from_config(config: &PatcherConfig, target: Target) -> Result<SchemaVersion, PatchError> {
    let patcher = Patcher::new(&config.patches)?;
    let target = target.resolve(&patcher)?;

    let mut executor = PgExecutor::connect(&config.database.url)?;
    let version = patcher.migrate(&mut executor, target)?;

    log::info!("Database at patch level {version}");
    Ok(version)
}
