//! Filesystem access for patch discovery and loading

use std::fs;
use std::io;
use std::path::Path;

/// Where patch files come from
///
/// The catalog lists entries through this trait and the sequencer reads patch
/// bodies through it, so a run can be driven from something other than the
/// local filesystem (embedded patches, tests).
pub trait PatchSource {
    /// File names (not paths) of the entries in `dir`
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Full UTF-8 text of the file at `path`
    fn read_text(&self, path: &Path) -> io::Result<String>;
}

/// [`PatchSource`] over `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl PatchSource for FsSource {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => log::warn!("Skipping non UTF-8 file name {:?} in {}", raw, dir.display()),
            }
        }
        Ok(names)
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}
