//! Recorded schema version in the metadata key/value table
//!
//! The metadata table is created by whatever bootstraps the database; the
//! patcher only reads and updates one row in it. Its `value` column may be
//! text or an integer type. A database without the table is at version 0.

use crate::executor::PatchExecutor;
use crate::patch::error::PatchError;
use crate::patch::record::SchemaVersion;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default metadata table name
pub const DEFAULT_TABLE: &str = "property";

/// Default key of the version row
pub const DEFAULT_KEY: &str = "patch";

// plain or schema-qualified identifier; the name is interpolated into SQL
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

/// Reads and writes the single "current schema version" row
#[derive(Debug, Clone)]
pub struct VersionStore {
    table: String,
    key: String,
    select_sql: String,
}

impl VersionStore {
    /// Store backed by row `key` of `table`
    ///
    /// # Errors
    ///
    /// Returns `PatchError::InvalidOption` if `table` is not a plain SQL identifier.
    pub fn new(table: &str, key: &str) -> Result<Self, PatchError> {
        if !IDENTIFIER.is_match(table) {
            return Err(PatchError::InvalidOption(format!(
                "metadata table '{table}' is not a valid SQL identifier"
            )));
        }
        if key.is_empty() {
            return Err(PatchError::InvalidOption("metadata key cannot be empty".into()));
        }

        Ok(Self {
            table: table.to_string(),
            key: key.to_string(),
            select_sql: format!("SELECT value::text FROM {table} WHERE key = $1"),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current recorded version
    ///
    /// A missing metadata table means the database has never been patched and
    /// reads as version 0.
    ///
    /// # Errors
    ///
    /// - `PatchError::Database` for any failure other than the missing table
    /// - `PatchError::MissingVersionRow` if the table exists without the key
    /// - `PatchError::InvalidStoredVersion` if the value is not a number
    pub fn read(&self, executor: &dyn PatchExecutor) -> Result<SchemaVersion, PatchError> {
        let value = match executor.query_value(&self.select_sql, &[self.key.as_str()]) {
            Ok(value) => value,
            Err(e) if e.is_undefined_table() => {
                log::debug!("Metadata table '{}' does not exist, version is 0", self.table);
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let value = value.ok_or_else(|| PatchError::MissingVersionRow {
            table: self.table.clone(),
            key: self.key.clone(),
        })?;

        value
            .trim()
            .parse()
            .map_err(|_| PatchError::InvalidStoredVersion { value })
    }

    /// Record `version`
    ///
    /// Version 0 is never written, so a database that was never patched (or
    /// was fully reverted) does not need the metadata table.
    ///
    /// # Errors
    ///
    /// - `PatchError::Database` if the update fails (including a missing table)
    /// - `PatchError::MissingVersionRow` if no row was updated
    pub fn write(&self, executor: &dyn PatchExecutor, version: SchemaVersion) -> Result<(), PatchError> {
        if version == 0 {
            log::debug!("Version 0, nothing to record");
            return Ok(());
        }

        // untyped literal, so it coerces to a text or integer column
        let update = format!("UPDATE {} SET value = '{version}' WHERE key = $1", self.table);
        let updated = executor.execute(&update, &[self.key.as_str()])?;
        if updated == 0 {
            return Err(PatchError::MissingVersionRow {
                table: self.table.clone(),
                key: self.key.clone(),
            });
        }

        Ok(())
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE, DEFAULT_KEY).expect("default metadata table is a valid identifier")
    }
}
