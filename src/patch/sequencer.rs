//! Step-by-step version traversal
//!
//! The sequencer moves the schema one version at a time. Going up it applies
//! the forward patch that ends at `current + 1`; going down, the reverse patch
//! that ends at `current - 1`. It never jumps, so every intermediate schema
//! state corresponds to exactly one patch file.

use crate::executor::PatchExecutor;
use crate::patch::catalog::PatchCatalog;
use crate::patch::error::PatchError;
use crate::patch::observer::{PatchEvent, PatchObserver};
use crate::patch::record::{Direction, PatchRecord, SchemaVersion};
use crate::patch::source::PatchSource;

#[cfg(feature = "tracing")]
use tracing::info_span;

/// The next single step between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub direction: Direction,
    /// Version the step ends at
    pub version: SchemaVersion,
}

/// In-flight state of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationRun {
    pub current: SchemaVersion,
    pub target: SchemaVersion,
}

impl MigrationRun {
    pub fn new(current: SchemaVersion, target: SchemaVersion) -> Self {
        Self { current, target }
    }

    pub fn is_done(&self) -> bool {
        self.current == self.target
    }

    /// The adjacent step toward the target, or `None` once there
    pub fn next_step(&self) -> Option<Step> {
        use std::cmp::Ordering;

        match self.target.cmp(&self.current) {
            Ordering::Equal => None,
            Ordering::Greater => Some(Step {
                direction: Direction::Forward,
                version: self.current + 1,
            }),
            Ordering::Less => Some(Step {
                direction: Direction::Reverse,
                version: self.current - 1,
            }),
        }
    }
}

/// Applies patches from a catalog until the target version is reached
pub struct Sequencer<'a> {
    catalog: &'a PatchCatalog,
    source: &'a dyn PatchSource,
    observer: &'a dyn PatchObserver,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        catalog: &'a PatchCatalog,
        source: &'a dyn PatchSource,
        observer: &'a dyn PatchObserver,
    ) -> Self {
        Self {
            catalog,
            source,
            observer,
        }
    }

    /// Step from `current` to `target`, returning the version reached
    ///
    /// Each patch is read and executed to completion before the next one is
    /// looked up. On failure the in-memory version stays at the last patch
    /// that succeeded; the caller is expected to roll the transaction back.
    ///
    /// # Errors
    ///
    /// - `PatchError::MissingPatch` if the catalog has no patch for the next step
    /// - `PatchError::Io` if a patch file cannot be read
    /// - `PatchError::PatchApplication` if a patch's statements fail
    pub fn run(
        &self,
        executor: &dyn PatchExecutor,
        current: SchemaVersion,
        target: SchemaVersion,
    ) -> Result<SchemaVersion, PatchError> {
        let mut run = MigrationRun::new(current, target);

        if run.is_done() {
            self.observer.on_event(&PatchEvent::UpToDate { version: current });
            return Ok(current);
        }

        while let Some(step) = run.next_step() {
            let patch = self
                .catalog
                .lookup(step.direction, step.version)
                .ok_or(PatchError::MissingPatch {
                    expected_version: step.version,
                    direction: step.direction,
                })?;

            self.apply(executor, patch)?;
            run.current = patch.to;
        }

        Ok(run.current)
    }

    fn apply(&self, executor: &dyn PatchExecutor, patch: &PatchRecord) -> Result<(), PatchError> {
        #[cfg(feature = "tracing")]
        let _span = info_span!("patchguard.apply", file = %patch.filename, from = patch.from, to = patch.to).entered();

        self.observer.on_event(&PatchEvent::PatchStarted { patch });

        let path = self.catalog.path_of(patch);
        let script = self
            .source
            .read_text(&path)
            .map_err(|e| PatchError::Io { path, source: e })?;

        executor
            .batch_execute(&script)
            .map_err(|e| PatchError::PatchApplication {
                patch: patch.clone(),
                source: e,
            })?;

        self.observer.on_event(&PatchEvent::PatchApplied { patch });
        Ok(())
    }
}
