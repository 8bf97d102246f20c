//! Progress reporting for patch runs
//!
//! Run progress (transaction boundaries, each patch, the recorded version)
//! is reported as [`PatchEvent`]s to an injected [`PatchObserver`].
//! [`LogObserver`] is the default and forwards to the `log` facade. Scan and
//! storage details below that level (skipped files, a missing metadata table)
//! go straight to `log` from the component that sees them.

use crate::executor::ExecError;
use crate::patch::error::PatchError;
use crate::patch::record::{PatchRecord, SchemaVersion};

/// Something that happened during a patch run
#[derive(Debug)]
pub enum PatchEvent<'a> {
    /// Catalog scanned, before the transaction is opened
    CatalogLoaded { patches: usize },
    TransactionStarted,
    VersionRead { version: SchemaVersion },
    /// Current version already equals the target
    UpToDate { version: SchemaVersion },
    PatchStarted { patch: &'a PatchRecord },
    PatchApplied { patch: &'a PatchRecord },
    VersionWritten { version: SchemaVersion },
    /// Final version is 0, so the metadata table was not touched
    VersionWriteSkipped,
    Committed { version: SchemaVersion },
    /// `ROLLBACK` after a failed run did not go through
    RollbackFailed { error: &'a ExecError },
    RolledBack { error: &'a PatchError },
}

/// Receives [`PatchEvent`]s
pub trait PatchObserver {
    fn on_event(&self, event: &PatchEvent<'_>);
}

/// Forwards events to the `log` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl PatchObserver for LogObserver {
    fn on_event(&self, event: &PatchEvent<'_>) {
        match event {
            PatchEvent::CatalogLoaded { patches } => log::debug!("Loaded {patches} patch file(s)"),
            PatchEvent::TransactionStarted => log::info!("Beginning transaction"),
            PatchEvent::VersionRead { version } => log::info!("Current patch level is {version}"),
            PatchEvent::UpToDate { version } => log::info!("Already at patch level {version}, no patching needed"),
            PatchEvent::PatchStarted { patch } => log::info!("Applying {patch}"),
            PatchEvent::PatchApplied { patch } => log::info!("Applied {patch}"),
            PatchEvent::VersionWritten { version } => log::info!("Recorded patch level {version}"),
            PatchEvent::VersionWriteSkipped => log::debug!("Patch level 0, nothing to record"),
            PatchEvent::Committed { version } => log::info!("Committed at patch level {version}"),
            PatchEvent::RollbackFailed { error } => {
                log::error!("Rollback after failed patch run also failed: {error}")
            }
            PatchEvent::RolledBack { error } => log::warn!("Rolled back: {error}"),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PatchObserver for NoopObserver {
    fn on_event(&self, _event: &PatchEvent<'_>) {}
}
