//! Patch-run error types

use crate::executor::ExecError;
use crate::patch::record::{Direction, PatchNameError, PatchRecord, SchemaVersion};
use std::path::PathBuf;

/// Everything that can abort a patch run
///
/// None of these are retried. Any error raised after the transaction was
/// opened causes a rollback before it reaches the caller, so the recorded
/// schema version is left where it was.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Patch directory or patch file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A patch file name does not follow the naming grammar
    #[error("Malformed patch name: {0}")]
    MalformedPatchName(#[from] PatchNameError),

    /// Two patches lead to the same version in the same direction
    #[error(
        "Duplicate {direction} patches to version {version}: '{first}' and '{second}'\n\
         Suggestion: remove or rename one of them"
    )]
    DuplicatePatch {
        version: SchemaVersion,
        direction: Direction,
        first: String,
        second: String,
    },

    /// Database failure outside of patch execution
    #[error("Database error: {0}")]
    Database(#[from] ExecError),

    /// The metadata table exists but has no row for the version key
    #[error("Metadata table '{table}' has no row for key '{key}'")]
    MissingVersionRow { table: String, key: String },

    /// The stored version is not a non-negative integer
    #[error("Stored schema version '{value}' is not a valid version number")]
    InvalidStoredVersion { value: String },

    /// No patch exists for the next required step
    #[error(
        "No {direction} patch to version {expected_version}\n\
         Suggestion: ensure the patch directory contains every step of the chain"
    )]
    MissingPatch {
        expected_version: SchemaVersion,
        direction: Direction,
    },

    /// A patch's statements failed
    #[error("Patch {patch} failed: {source}")]
    PatchApplication {
        patch: PatchRecord,
        #[source]
        source: ExecError,
    },

    /// Options that cannot be used safely (e.g. a table name that is not an identifier)
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Could not reach the database
    #[error("Connection error: {0}")]
    Connection(#[from] crate::connection::ConnectionError),
}
