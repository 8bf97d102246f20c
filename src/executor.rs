//! `PatchExecutor` - the statement-execution seam.
//!
//! Everything that touches the database goes through [`PatchExecutor`]. The
//! PostgreSQL implementation wraps a `may_postgres::Client`; tests use an
//! in-memory implementation that records statements.
//!
//! Parameters are passed as text. The patcher only binds the metadata key;
//! patch files themselves are executed as unparameterised scripts.

use may_postgres::error::SqlState;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError};
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::trace_span;

/// Executor-level error type
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// `PostgreSQL` error from `may_postgres`
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] PostgresError),
    /// A statement referenced a relation that does not exist
    #[error("Undefined table: {0}")]
    UndefinedTable(String),
    /// Statement issued through a transaction that was already committed or rolled back
    #[error("Transaction has already been committed or rolled back")]
    TransactionClosed,
    /// Query execution error reported by a non-PostgreSQL executor
    #[error("Query error: {0}")]
    Query(String),
}

impl ExecError {
    /// Whether the failure was caused by a missing relation (SQLSTATE `42P01`).
    pub fn is_undefined_table(&self) -> bool {
        match self {
            ExecError::UndefinedTable(_) => true,
            ExecError::Postgres(e) => e.code() == Some(&SqlState::UNDEFINED_TABLE),
            _ => false,
        }
    }
}

/// Trait for executing statements against the target database
///
/// Implementations may be a direct connection, a [`Transaction`](crate::transaction::Transaction)
/// guard, or a test double.
pub trait PatchExecutor {
    /// Execute a single statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `ExecError` if the statement fails.
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, ExecError>;

    /// Execute a script of one or more `;`-separated statements
    ///
    /// Used for patch file content and transaction control statements.
    ///
    /// # Errors
    ///
    /// Returns `ExecError` on the first failing statement.
    fn batch_execute(&self, script: &str) -> Result<(), ExecError>;

    /// Run a query and return the first column of the first row as text
    ///
    /// Returns `Ok(None)` when the query produced no rows or the value was `NULL`.
    ///
    /// # Errors
    ///
    /// Returns `ExecError` if the query fails.
    fn query_value(&self, query: &str, params: &[&str]) -> Result<Option<String>, ExecError>;
}

impl<E: PatchExecutor + ?Sized> PatchExecutor for &E {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, ExecError> {
        (**self).execute(query, params)
    }

    fn batch_execute(&self, script: &str) -> Result<(), ExecError> {
        (**self).batch_execute(script)
    }

    fn query_value(&self, query: &str, params: &[&str]) -> Result<Option<String>, ExecError> {
        (**self).query_value(query, params)
    }
}

fn to_sql_params<'a>(params: &'a [&'a str]) -> Vec<&'a dyn ToSql> {
    params.iter().map(|p| p as &dyn ToSql).collect()
}

/// Implementation of `PatchExecutor` for `may_postgres::Client`
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect to `connection_string` and wrap the client
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the string is malformed or the server is unreachable.
    pub fn connect(connection_string: &str) -> Result<Self, crate::connection::ConnectionError> {
        crate::connection::connect(connection_string).map(Self::new)
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }
}

impl PatchExecutor for PgExecutor {
    fn execute(&self, query: &str, params: &[&str]) -> Result<u64, ExecError> {
        #[cfg(feature = "tracing")]
        let _span = trace_span!("patchguard.execute", query).entered();

        let start = Instant::now();
        let result = self.client.execute(query, &to_sql_params(params));
        log::trace!("execute finished in {:?}", start.elapsed());

        result.map_err(ExecError::from)
    }

    fn batch_execute(&self, script: &str) -> Result<(), ExecError> {
        #[cfg(feature = "tracing")]
        let _span = trace_span!("patchguard.batch_execute", bytes = script.len()).entered();

        let start = Instant::now();
        let result = self.client.batch_execute(script);
        log::trace!("batch of {} bytes finished in {:?}", script.len(), start.elapsed());

        result.map_err(ExecError::from)
    }

    fn query_value(&self, query: &str, params: &[&str]) -> Result<Option<String>, ExecError> {
        #[cfg(feature = "tracing")]
        let _span = trace_span!("patchguard.query_value", query).entered();

        let rows = self.client.query(query, &to_sql_params(params))?;
        match rows.first() {
            Some(row) => Ok(row.try_get::<_, Option<String>>(0)?),
            None => Ok(None),
        }
    }
}
