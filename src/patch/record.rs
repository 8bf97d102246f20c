//! Patch descriptors and file name parsing

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Schema version as recorded in the metadata table
pub type SchemaVersion = u32;

/// Characters accepted between the tokens of a patch file name
pub const SEPARATORS: [char; 3] = ['-', '_', '.'];

// prefix, from, to, then anything (usually the extension)
static PATCH_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^-_.]+)[-_.]([^-_.]+)[-_.]([^-_.]+)(?:[-_.].*)?$").expect("valid regex"));

/// Which way a patch moves the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward,
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// Why a file name could not be turned into a [`PatchRecord`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchNameError {
    #[error("patch file name '{filename}' does not match <prefix>-<from>-<to>[.<ext>]")]
    Pattern { filename: String },

    #[error("patch file name '{filename}' version '{token}' is not a valid version number")]
    NotANumber { filename: String, token: String },

    #[error("patch file name '{filename}' goes from version {version} to itself")]
    SameVersion { filename: String, version: SchemaVersion },
}

/// One discovered patch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub filename: String,
}

impl PatchRecord {
    /// Parse `filename` into a record
    ///
    /// The grammar is `<prefix><sep><from><sep><to>[<sep><rest>]` where `<sep>`
    /// is one of `-`, `_` or `.` (see [`SEPARATORS`]).
    ///
    /// # Example
    /// - `patch-0-1.sql` → from 0, to 1
    /// - `patch_12_11.sql` → from 12, to 11
    pub fn parse(filename: &str) -> Result<Self, PatchNameError> {
        let caps = PATCH_NAME.captures(filename).ok_or_else(|| PatchNameError::Pattern {
            filename: filename.to_string(),
        })?;

        let version = |index: usize| -> Result<SchemaVersion, PatchNameError> {
            let token = &caps[index];
            token.parse().map_err(|_| PatchNameError::NotANumber {
                filename: filename.to_string(),
                token: token.to_string(),
            })
        };
        let from = version(2)?;
        let to = version(3)?;

        if from == to {
            return Err(PatchNameError::SameVersion {
                filename: filename.to_string(),
                version: from,
            });
        }

        Ok(Self {
            from,
            to,
            filename: filename.to_string(),
        })
    }

    /// The leading token of a patch-like file name, if it has one
    pub fn prefix_of(filename: &str) -> &str {
        filename.split(SEPARATORS).next().unwrap_or_default()
    }

    pub fn direction(&self) -> Direction {
        if self.to > self.from {
            Direction::Forward
        } else {
            Direction::Reverse
        }
    }
}

impl fmt::Display for PatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.filename, self.from, self.to)
    }
}
