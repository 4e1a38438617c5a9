//! Typed record operations
//!
//! This module translates typed calls (insert a record, count rows, run a
//! scalar query) into operations on a [`Command`]. Each repository method is
//! a single execution through the repository's [`ExecContext`], so installing
//! a different filter changes how every one of them runs without touching
//! the call sites.

use anyhow::{anyhow, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Params, Row, ToSql};

use super::core::{Command, DatabaseConn};
use crate::filter::ExecContext;

/// Conversion from a result row
pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

macro_rules! first_column_from_row {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRow for $ty {
                fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
                    row.get(0)
                }
            }
        )*
    };
}

first_column_from_row!(i64, u64, f64, String, bool, Option<i64>, Option<String>);

/// A type persisted as one row of one table
pub trait Record: FromRow {
    /// Table name
    const TABLE: &'static str;
    /// `CREATE TABLE` statement for the table
    const CREATE_TABLE: &'static str;
    /// Columns written by [`RecordRepository::insert`], in `values()` order
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;
}

/// Repository running typed record operations through an execution context
pub struct RecordRepository<'a> {
    db: &'a DatabaseConn,
    ctx: ExecContext,
}

impl<'a> RecordRepository<'a> {
    pub fn new(db: &'a DatabaseConn, ctx: ExecContext) -> Self {
        Self { db, ctx }
    }

    fn exec<T, F>(&self, op: F) -> Result<T>
    where
        T: Default + 'static,
        F: FnMut(&mut Command<'_>) -> Result<T>,
    {
        self.ctx.exec(self.db, op)
    }

    /// Create the record's table
    pub fn create_table<R: Record>(&self) -> Result<()> {
        self.exec(|cmd| cmd.execute_batch(R::CREATE_TABLE))
    }

    /// Drop the record's table if present and create it again
    pub fn drop_and_create_table<R: Record>(&self) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {};\n{}", R::TABLE, R::CREATE_TABLE);
        self.exec(|cmd| cmd.execute_batch(&sql))
    }

    /// Insert a record, returning the rowid of the last insert
    pub fn insert<R: Record>(&self, record: &R) -> Result<i64> {
        let sql = insert_sql::<R>();
        self.exec(|cmd| {
            cmd.execute(&sql, params_from_iter(record.values()))?;
            Ok(cmd.last_insert_rowid())
        })
    }

    /// Number of rows in the record's table
    pub fn count<R: Record>(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        self.exec(|cmd| cmd.query_row(&sql, [], |row| row.get(0)))
    }

    /// Number of rows whose `column` equals `value`
    pub fn count_where<R: Record>(&self, column: &str, value: impl ToSql) -> Result<u64> {
        let column = checked_column::<R>(column)?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", R::TABLE, column);
        self.exec(|cmd| cmd.query_row(&sql, [&value], |row| row.get(0)))
    }

    /// Records whose `column` equals `value`
    pub fn select_where<R>(&self, column: &str, value: impl ToSql) -> Result<Vec<R>>
    where
        R: Record + 'static,
    {
        let column = checked_column::<R>(column)?;
        let sql = format!("SELECT * FROM {} WHERE {} = ?1", R::TABLE, column);
        self.exec(|cmd| cmd.query_all(&sql, [&value], R::from_row))
    }

    /// Map the first row of an arbitrary query
    ///
    /// A query returning no rows yields `T::default()`.
    pub fn sql_scalar<T, P>(&self, sql: &str, params: P) -> Result<T>
    where
        T: FromRow + Default + 'static,
        P: Params + Copy,
    {
        self.exec(|cmd| {
            let row = cmd.with_statement(sql, |stmt| {
                stmt.query_row(params, T::from_row).optional()
            })?;
            Ok(row.unwrap_or_default())
        })
    }

    /// Map every row of an arbitrary query
    pub fn sql_select<T, P>(&self, sql: &str, params: P) -> Result<Vec<T>>
    where
        T: FromRow + 'static,
        P: Params + Copy,
    {
        self.exec(|cmd| cmd.query_all(sql, params, T::from_row))
    }

    /// Execute an arbitrary statement, returning the number of changed rows
    pub fn sql_execute<P>(&self, sql: &str, params: P) -> Result<usize>
    where
        P: Params + Copy,
    {
        self.exec(|cmd| cmd.execute(sql, params))
    }
}

fn insert_sql<R: Record>() -> String {
    let placeholders = (1..=R::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders
    )
}

fn checked_column<R: Record>(column: &str) -> Result<&str> {
    if column == "id" || R::COLUMNS.contains(&column) {
        Ok(column)
    } else {
        Err(anyhow!(
            "Unknown column '{}' for table '{}'",
            column,
            R::TABLE
        ))
    }
}
