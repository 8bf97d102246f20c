//! Patch discovery: directory scan into forward/reverse lookup tables

use crate::patch::error::PatchError;
use crate::patch::record::{Direction, PatchRecord, SchemaVersion};
use crate::patch::source::PatchSource;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Index of the patches found in one directory
///
/// Both tables are keyed by the patch's *destination* version. At most one
/// patch may lead to a given version in a given direction.
#[derive(Debug, Clone, Default)]
pub struct PatchCatalog {
    dir: PathBuf,
    forward: BTreeMap<SchemaVersion, PatchRecord>,
    reverse: BTreeMap<SchemaVersion, PatchRecord>,
}

impl PatchCatalog {
    /// Scan `dir` through `source` and index every patch whose name starts with `prefix`
    ///
    /// Editor backups (`*~`), dot-files and entries with a different leading
    /// token are skipped. Entries are processed in file name order.
    ///
    /// # Errors
    ///
    /// - `PatchError::Io` if the directory cannot be listed
    /// - `PatchError::MalformedPatchName` if a prefixed name does not parse
    /// - `PatchError::DuplicatePatch` if two patches lead to the same version in the same direction
    pub fn scan(source: &dyn PatchSource, dir: &Path, prefix: &str) -> Result<Self, PatchError> {
        let mut entries = source.list_entries(dir).map_err(|e| PatchError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        entries.sort();

        let mut catalog = Self {
            dir: dir.to_path_buf(),
            ..Self::default()
        };

        for filename in entries {
            if filename.ends_with('~') || filename.starts_with('.') {
                log::debug!("Skipping backup or hidden file {filename}");
                continue;
            }
            if PatchRecord::prefix_of(&filename) != prefix {
                log::debug!("Skipping {filename}: prefix is not '{prefix}'");
                continue;
            }

            catalog.insert(PatchRecord::parse(&filename)?)?;
        }

        log::debug!(
            "Found {} forward and {} reverse patch(es) in {}",
            catalog.forward.len(),
            catalog.reverse.len(),
            dir.display()
        );

        Ok(catalog)
    }

    fn insert(&mut self, patch: PatchRecord) -> Result<(), PatchError> {
        let direction = patch.direction();
        let table = match direction {
            Direction::Forward => &mut self.forward,
            Direction::Reverse => &mut self.reverse,
        };

        match table.entry(patch.to) {
            Entry::Vacant(slot) => {
                slot.insert(patch);
                Ok(())
            }
            Entry::Occupied(existing) => Err(PatchError::DuplicatePatch {
                version: patch.to,
                direction,
                first: existing.get().filename.clone(),
                second: patch.filename,
            }),
        }
    }

    /// The forward patch that ends at `version`
    pub fn forward(&self, version: SchemaVersion) -> Option<&PatchRecord> {
        self.forward.get(&version)
    }

    /// The reverse patch that ends at `version`
    pub fn reverse(&self, version: SchemaVersion) -> Option<&PatchRecord> {
        self.reverse.get(&version)
    }

    pub fn lookup(&self, direction: Direction, version: SchemaVersion) -> Option<&PatchRecord> {
        match direction {
            Direction::Forward => self.forward(version),
            Direction::Reverse => self.reverse(version),
        }
    }

    /// Highest version reachable by a forward patch
    pub fn latest(&self) -> Option<SchemaVersion> {
        self.forward.keys().next_back().copied()
    }

    /// All patches, forward ones first, each direction in destination order
    pub fn patches(&self) -> impl Iterator<Item = &PatchRecord> {
        self.forward.values().chain(self.reverse.values())
    }

    pub fn len(&self) -> usize {
        self.forward.len() + self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Directory the catalog was scanned from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of `patch` on disk
    pub fn path_of(&self, patch: &PatchRecord) -> PathBuf {
        self.dir.join(&patch.filename)
    }
}
