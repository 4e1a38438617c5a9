//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper handing out commands
//! - `Command`: the per-execution command and its lifecycle counters
//! - `ConnectionProvider` / `DbFactory`: where connections come from

mod command;
mod connection;

pub use command::{Command, CommandStats};
pub use connection::{ConnectionProvider, DatabaseConn, DbFactory};
