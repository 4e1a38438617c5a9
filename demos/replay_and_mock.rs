//! Replay and Mock Example
//!
//! This example installs a replay filter and a stored-procedure mock around
//! ordinary record operations, without changing the calling code.
//!
//! # Running
//!
//! ```bash
//! cargo run --example replay_and_mock
//! ```

use std::sync::Arc;

use execfilter::{
    install_scoped, AuditFilter, DatabaseConn, ExecContext, FromRow, MockFilter, Record,
    ReplayFilter,
};
use rusqlite::types::Value;
use rusqlite::Row;

#[derive(Debug, Clone, Default)]
struct Visit {
    page: String,
}

impl FromRow for Visit {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Visit {
            page: row.get("page")?,
        })
    }
}

impl Record for Visit {
    const TABLE: &'static str = "visit";
    const CREATE_TABLE: &'static str =
        "CREATE TABLE visit (id INTEGER PRIMARY KEY AUTOINCREMENT, page TEXT NOT NULL)";
    const COLUMNS: &'static [&'static str] = &["page"];

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.page.clone())]
    }
}

fn main() -> anyhow::Result<()> {
    println!("=== Execution Filter Example ===\n");

    let db = DatabaseConn::open_in_memory()?;
    db.records().drop_and_create_table::<Visit>()?;

    // Example 1: default pass-through filter
    println!("1. Inserting one visit with the default filter:");
    db.records().insert(&Visit {
        page: "/home".to_string(),
    })?;
    println!("   /home visits: {}", db.records().count_where::<Visit>("page", "/home")?);

    // Example 2: replay every operation three times
    println!("\n2. Inserting one visit under ReplayFilter(3):");
    {
        let _guard = install_scoped(Arc::new(ReplayFilter::new(3)));
        db.records().insert(&Visit {
            page: "/about".to_string(),
        })?;
    }
    println!("   /about visits: {}", db.records().count_where::<Visit>("page", "/about")?);

    // Example 3: mock a stored procedure SQLite does not have
    println!("\n3. Calling a mocked stored procedure:");
    let mock = MockFilter::new().on_sql("exec sp_top_page", || Visit {
        page: "/mocked".to_string(),
    });
    let audit = Arc::new(AuditFilter::wrapping("demo", Arc::new(mock)));
    let records = db.records_with(ExecContext::pinned(audit.clone()));
    let top: Visit = records.sql_scalar("exec sp_top_page", [])?;
    println!("   top page: {}", top.page);
    println!("   audited executions: {:?}", audit.stats());

    // Example 4: command bookkeeping
    println!("\n4. Command lifecycle:");
    let stats = db.command_stats();
    println!(
        "   created: {}, disposed: {}, outstanding: {}",
        stats.created,
        stats.disposed,
        stats.outstanding()
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
