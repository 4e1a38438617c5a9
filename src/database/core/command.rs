//! Command lifecycle
//!
//! A [`Command`] is the unit every execution filter hands to an operation.
//! It is bound to one [`DatabaseConn`], remembers the last SQL text it ran
//! and is released exactly once, either through [`Command::dispose`] or when
//! it is dropped during unwinding.

use std::cell::Cell;

use anyhow::Result;
use rusqlite::{CachedStatement, Params, Row};

use super::DatabaseConn;

/// Snapshot of the command counters of one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandStats {
    pub created: u64,
    pub disposed: u64,
}

impl CommandStats {
    /// Commands created but not yet released
    pub fn outstanding(&self) -> u64 {
        self.created.saturating_sub(self.disposed)
    }
}

/// Per-connection bookkeeping for command creation and release
#[derive(Debug, Default)]
pub(crate) struct CommandCounters {
    created: Cell<u64>,
    disposed: Cell<u64>,
}

impl CommandCounters {
    fn on_create(&self) -> u64 {
        let id = self.created.get() + 1;
        self.created.set(id);
        id
    }

    fn on_dispose(&self) {
        self.disposed.set(self.disposed.get() + 1);
    }

    pub(crate) fn stats(&self) -> CommandStats {
        CommandStats {
            created: self.created.get(),
            disposed: self.disposed.get(),
        }
    }
}

/// A database command scoped to a single connection
///
/// Every statement run through a command is recorded as its `last_sql`
/// before it is prepared, so the text is available even when preparation
/// fails (e.g. a call to a stored procedure SQLite does not understand).
pub struct Command<'c> {
    db: &'c DatabaseConn,
    id: u64,
    last_sql: Option<String>,
    executions: u64,
}

impl<'c> Command<'c> {
    pub(crate) fn new(db: &'c DatabaseConn) -> Self {
        let id = db.counters().on_create();
        Command {
            db,
            id,
            last_sql: None,
            executions: 0,
        }
    }

    /// Sequence number of this command on its connection (starting at 1)
    pub fn id(&self) -> u64 {
        self.id
    }

    /// SQL text of the most recent statement run through this command
    pub fn last_sql(&self) -> Option<&str> {
        self.last_sql.as_deref()
    }

    /// Number of statements run through this command
    pub fn executions(&self) -> u64 {
        self.executions
    }

    fn record(&mut self, sql: &str) {
        self.last_sql = Some(sql.to_string());
        self.executions += 1;
    }

    /// Run `f` against the cached prepared statement for `sql`
    pub fn with_statement<T, F>(&mut self, sql: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut CachedStatement<'_>) -> rusqlite::Result<T>,
    {
        self.record(sql);
        let mut stmt = self.db.conn.prepare_cached(sql)?;
        Ok(f(&mut stmt)?)
    }

    /// Execute a single statement, returning the number of changed rows
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<usize> {
        self.with_statement(sql, |stmt| stmt.execute(params))
    }

    /// Execute a batch of semicolon-separated statements without parameters
    pub fn execute_batch(&mut self, sql: &str) -> Result<()> {
        self.record(sql);
        self.db.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query expected to return at least one row and map the first
    pub fn query_row<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_statement(sql, |stmt| stmt.query_row(params, f))
    }

    /// Run a query and map every returned row
    pub fn query_all<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_statement(sql, |stmt| stmt.query_map(params, f)?.collect())
    }

    /// Rowid of the most recent successful insert on the connection
    pub fn last_insert_rowid(&self) -> i64 {
        self.db.conn.last_insert_rowid()
    }

    /// Release the command, returning the last SQL text it ran
    pub fn dispose(mut self) -> Option<String> {
        self.last_sql.take()
    }
}

impl Drop for Command<'_> {
    fn drop(&mut self) {
        self.db.counters().on_dispose();
    }
}

impl std::fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("last_sql", &self.last_sql)
            .field("executions", &self.executions)
            .finish()
    }
}
