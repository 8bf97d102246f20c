//! # Patchguard
//!
//! Versioned SQL patch runner for PostgreSQL on `may_postgres`.
//!
//! Moves a database between numbered schema versions by applying
//! forward or reverse patch files one step at a time, all inside a single
//! transaction. See [`patch`] for the file naming rules.

pub mod config;
pub mod connection;
pub mod executor;
pub mod patch;
pub mod transaction;

#[cfg(test)]
mod test_helpers;

pub use config::{DatabaseConfig, PatchOptions, PatcherConfig};
pub use connection::{connect, ConnectionError};
pub use executor::{ExecError, PatchExecutor, PgExecutor};
pub use patch::startup;
pub use patch::{
    migrate, Direction, LogObserver, NoopObserver, PatchCatalog, PatchError, PatchEvent,
    PatchObserver, PatchRecord, PatchSource, Patcher, SchemaVersion, Target, VersionStore,
};
pub use transaction::Transaction;
