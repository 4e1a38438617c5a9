#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! execfilter - pluggable command execution for SQLite access
//!
//! Every typed database operation (insert, count, scalar query) runs through
//! a single indirection point: an [`ExecFilter`] creates a command on the
//! connection, invokes the operation against it and disposes it. Swapping
//! the filter changes how every call site executes, which is how replay,
//! stored-procedure mocking and auditing are layered on without touching
//! the calling code.
//!
//! # Architecture
//!
//! - **[`database`]**: SQLite connection wrapper, the command lifecycle and
//!   typed record operations
//! - **[`filter`]**: the filter trait and its implementations, the global
//!   registry and explicit execution contexts
//! - **[`config`]**: configuration file / environment handling and filter
//!   chain construction
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` (default) | `execfilter` binary | `clap`, `tabled`, `tracing-subscriber` |
//!
//! # Quick Start
//!
//! ## Replaying an insert
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use execfilter::filter::{install_scoped, ReplayFilter};
//!
//! let db = DatabaseConn::open_in_memory()?;
//! db.records().drop_and_create_table::<Model>()?;
//!
//! {
//!     let _guard = install_scoped(Arc::new(ReplayFilter::new(3)));
//!     db.records().insert(&Model::named("Multiplicity"))?;
//! }
//!
//! assert_eq!(db.records().count_where::<Model>("name", "Multiplicity")?, 3);
//! ```
//!
//! ## Mocking a stored procedure
//!
//! ```rust,ignore
//! use execfilter::filter::{ExecContext, MockFilter};
//!
//! let mock = MockFilter::new().on_sql("exec sp_name @firstName, @age", || Person {
//!     first_name: "Mocked".to_string(),
//!     ..Default::default()
//! });
//! let records = db.records_with(ExecContext::pinned(Arc::new(mock)));
//! let person: Person = records.sql_scalar(
//!     "exec sp_name @firstName, @age",
//!     named_params! { "@firstName": "aName", "@age": 1 },
//! )?;
//! assert_eq!(person.first_name, "Mocked");
//! ```

pub mod config;
pub mod database;
pub mod filter;

pub use config::{ExecFilterConfig, MockEntry};

pub use database::{
    Command, CommandStats, ConnectionProvider, DatabaseConn, DbFactory, FromRow, Record,
    RecordRepository,
};

pub use filter::{
    active_filter, install_scoped, reset_active_filter, set_active_filter, with_filter,
    AuditFilter, ExecContext, ExecFailure, ExecFilter, ExecFilterExt, ExecOutcome, MockFilter,
    PassThroughFilter, ReplayFilter, ScopedFilter,
};
