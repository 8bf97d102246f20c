//! In-memory doubles for unit tests.
//!
//! `MemoryDatabase` models just enough of PostgreSQL's transaction behaviour
//! to exercise the patcher: `BEGIN`/`COMMIT`/`ROLLBACK`, a single savepoint,
//! aborted-transaction state after a failed statement, and one key/value
//! metadata table named `property`. Scripts that create, seed or drop that
//! table change it; every other script is only recorded.

use crate::executor::{ExecError, PatchExecutor};
use crate::patch::PatchSource;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    /// `None` while the metadata table does not exist
    metadata: Option<BTreeMap<String, String>>,
    scripts: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    committed: Snapshot,
    pending: Option<Snapshot>,
    savepoint: Option<Snapshot>,
    aborted: bool,
    statements: Vec<String>,
    fail_on: Vec<String>,
}

impl State {
    fn current(&self) -> &Snapshot {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    fn current_mut(&mut self) -> &mut Snapshot {
        match self.pending {
            Some(ref mut pending) => pending,
            None => &mut self.committed,
        }
    }

    fn fail(&mut self, err: ExecError) -> ExecError {
        if self.pending.is_some() {
            self.aborted = true;
        }
        err
    }

    fn check_aborted(&self) -> Result<(), ExecError> {
        if self.aborted {
            return Err(ExecError::Query(
                "current transaction is aborted, commands ignored until end of transaction block".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryDatabase {
    state: RefCell<State>,
}

impl MemoryDatabase {
    /// A database with no metadata table (never patched)
    pub fn new() -> Self {
        Self::default()
    }

    /// A database whose metadata table records `version` under `key`
    pub fn with_version(key: &str, version: &str) -> Self {
        let db = Self::new();
        db.state.borrow_mut().committed.metadata =
            Some(BTreeMap::from([(key.to_string(), version.to_string())]));
        db
    }

    /// A database whose metadata table exists but is empty
    pub fn with_empty_metadata() -> Self {
        let db = Self::new();
        db.state.borrow_mut().committed.metadata = Some(BTreeMap::new());
        db
    }

    /// Make every script containing `needle` fail
    pub fn fail_on(self, needle: &str) -> Self {
        self.state.borrow_mut().fail_on.push(needle.to_string());
        self
    }

    /// Every statement and script received, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().statements.clone()
    }

    /// Patch scripts that survived to a committed state
    pub fn committed_scripts(&self) -> Vec<String> {
        self.state.borrow().committed.scripts.clone()
    }

    /// The committed metadata value for `key`
    pub fn committed_value(&self, key: &str) -> Option<String> {
        let state = self.state.borrow();
        state.committed.metadata.as_ref()?.get(key).cloned()
    }

    pub fn in_transaction(&self) -> bool {
        self.state.borrow().pending.is_some()
    }
}

fn undefined_table() -> ExecError {
    ExecError::UndefinedTable("relation \"property\" does not exist".into())
}

impl PatchExecutor for MemoryDatabase {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, ExecError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(query.to_string());
        state.check_aborted()?;

        if !query.trim_start().starts_with("UPDATE") {
            return Err(state.fail(ExecError::Query(format!("unsupported statement: {query}"))));
        }
        let value = query
            .split('\'')
            .nth(1)
            .filter(|v| v.parse::<u64>().is_ok())
            .map(str::to_string);
        let (value, key) = match (value, params) {
            (Some(value), [key]) => (value, key.to_string()),
            _ => {
                return Err(state.fail(ExecError::Query(
                    "expected a quoted numeric value and one key parameter".into(),
                )))
            }
        };

        if state.current().metadata.is_none() {
            return Err(state.fail(undefined_table()));
        }
        let table = state.current_mut().metadata.get_or_insert_with(BTreeMap::new);
        match table.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn batch_execute(&self, script: &str) -> Result<(), ExecError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(script.to_string());
        let statement = script.trim();

        if statement == "BEGIN" {
            let snapshot = state.committed.clone();
            state.pending = Some(snapshot);
            state.aborted = false;
        } else if statement == "COMMIT" {
            // COMMIT of an aborted transaction rolls back, as in PostgreSQL
            if let Some(pending) = state.pending.take() {
                if !state.aborted {
                    state.committed = pending;
                }
            }
            state.aborted = false;
        } else if statement == "ROLLBACK" {
            state.pending = None;
            state.savepoint = None;
            state.aborted = false;
        } else if statement.starts_with("SAVEPOINT") {
            state.check_aborted()?;
            let snapshot = state.current().clone();
            state.savepoint = Some(snapshot);
        } else if statement.starts_with("ROLLBACK TO SAVEPOINT") {
            if let Some(snapshot) = state.savepoint.take() {
                *state.current_mut() = snapshot;
            }
            state.aborted = false;
        } else {
            state.check_aborted()?;
            if state.fail_on.iter().any(|needle| statement.contains(needle.as_str())) {
                return Err(state.fail(ExecError::Query(format!("syntax error in: {statement}"))));
            }
            let creates = statement.contains("CREATE TABLE property");
            let seeds = statement.contains("INSERT INTO property");
            if seeds && !creates && state.current().metadata.is_none() {
                return Err(state.fail(undefined_table()));
            }
            let snapshot = state.current_mut();
            if creates {
                snapshot.metadata.get_or_insert_with(BTreeMap::new);
            }
            if seeds {
                snapshot
                    .metadata
                    .get_or_insert_with(BTreeMap::new)
                    .insert("patch".to_string(), "0".to_string());
            }
            if statement.contains("DROP TABLE property") {
                snapshot.metadata = None;
            }
            snapshot.scripts.push(statement.to_string());
        }

        Ok(())
    }

    fn query_value(&self, query: &str, params: &[&str]) -> Result<Option<String>, ExecError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(query.to_string());
        state.check_aborted()?;

        let key = params.first().copied().unwrap_or_default();
        match state.current().metadata.as_ref() {
            Some(table) => Ok(table.get(key).cloned()),
            None => Err(state.fail(undefined_table())),
        }
    }
}

/// A `PatchSource` backed by an in-memory file map
#[derive(Debug, Default)]
pub(crate) struct MemorySource {
    files: BTreeMap<String, String>,
    reads: RefCell<Vec<String>>,
}

impl MemorySource {
    pub fn new<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(name, body)| (name.to_string(), body.to_string()))
                .collect(),
            reads: RefCell::new(Vec::new()),
        }
    }

    /// File names read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.reads.borrow().clone()
    }
}

impl PatchSource for MemorySource {
    fn list_entries(&self, _dir: &Path) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read_text(&self, path: &Path) -> io::Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let body = self
            .files
            .get(&name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{name} not found")))?;
        self.reads.borrow_mut().push(name);
        Ok(body)
    }
}
