//! Database module
//!
//! ```text
//! database/
//! ├── core/        # Foundation
//! │   ├── connection  # DatabaseConn, ConnectionProvider, DbFactory
//! │   └── command     # Command lifecycle and counters
//! │
//! └── records      # Typed operations (insert, count, scalar) run through filters
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use execfilter::database::{DatabaseConn, Record};
//!
//! let db = DatabaseConn::open_in_memory()?;
//! let records = db.records();
//! records.drop_and_create_table::<Person>()?;
//! records.insert(&person)?;
//! let n = records.count_where::<Person>("first_name", "Jane")?;
//! ```

pub mod core;
pub mod records;

pub use core::{Command, CommandStats, ConnectionProvider, DatabaseConn, DbFactory};
pub use records::{FromRow, Record, RecordRepository};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
