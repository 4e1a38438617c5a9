//! Database connection management
//!
//! This module provides the connection wrapper every execution filter runs
//! against, and the [`ConnectionProvider`] seam used to obtain one.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::info;

use super::command::{Command, CommandCounters, CommandStats};
use crate::database::records::RecordRepository;
use crate::filter::ExecContext;

/// Core database connection wrapper
///
/// `DatabaseConn` wraps a SQLite connection, handling both file-based and
/// in-memory databases with consistent configuration, and hands out the
/// [`Command`]s that execution filters operate on.
pub struct DatabaseConn {
    pub conn: Connection,
    counters: CommandCounters,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn {
            conn,
            counters: CommandCounters::default(),
        };
        db.configure()?;
        info!("Opened database at {}", path.unwrap_or(":memory:"));
        Ok(db)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn configure(&self) -> Result<()> {
        // WAL only takes effect for file databases; in-memory reports "memory"
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        Ok(())
    }

    /// Create a fresh command bound to this connection
    pub fn create_command(&self) -> Command<'_> {
        Command::new(self)
    }

    /// Created/disposed command counters for this connection
    pub fn command_stats(&self) -> CommandStats {
        self.counters.stats()
    }

    pub(crate) fn counters(&self) -> &CommandCounters {
        &self.counters
    }

    /// Typed record operations routed through the globally active filter
    pub fn records(&self) -> RecordRepository<'_> {
        RecordRepository::new(self, ExecContext::Global)
    }

    /// Typed record operations routed through an explicit execution context
    pub fn records_with(&self, ctx: ExecContext) -> RecordRepository<'_> {
        RecordRepository::new(self, ctx)
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }
}

/// Source of database connections
pub trait ConnectionProvider {
    fn open_connection(&self) -> Result<DatabaseConn>;
}

/// Opens connections to a fixed SQLite location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbFactory {
    path: Option<String>,
}

impl DbFactory {
    /// Factory for a database file; `None` yields a new in-memory database per open
    pub fn new(path: Option<String>) -> Self {
        Self { path }
    }

    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl ConnectionProvider for DbFactory {
    fn open_connection(&self) -> Result<DatabaseConn> {
        DatabaseConn::open(self.path.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_table_exists() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.conn
            .execute("CREATE TABLE test_table (id INTEGER PRIMARY KEY)", [])
            .unwrap();

        assert!(db.table_exists("test_table").unwrap());
        assert!(!db.table_exists("nonexistent_table").unwrap());
    }

    #[test]
    fn test_fresh_connection_has_no_commands() {
        let db = DatabaseConn::open_in_memory().unwrap();
        assert_eq!(db.command_stats(), CommandStats::default());
    }

    #[test]
    fn test_factory_shares_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.sqlite3");
        let factory = DbFactory::new(Some(path.to_string_lossy().to_string()));

        let first = factory.open_connection().unwrap();
        first
            .conn
            .execute("CREATE TABLE shared (id INTEGER PRIMARY KEY)", [])
            .unwrap();
        drop(first);

        let second = factory.open_connection().unwrap();
        assert!(second.table_exists("shared").unwrap());
    }

    #[test]
    fn test_in_memory_factory_isolates_connections() {
        let factory = DbFactory::in_memory();
        let first = factory.open_connection().unwrap();
        first
            .conn
            .execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY)", [])
            .unwrap();

        let second = factory.open_connection().unwrap();
        assert!(!second.table_exists("scratch").unwrap());
        assert_eq!(factory.path(), None);
    }
}
