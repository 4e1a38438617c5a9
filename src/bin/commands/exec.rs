use anyhow::Result;
use clap::Args;
use execfilter::ExecFilterConfig;
use rusqlite::params_from_iter;
use serde_json::Value;

use super::output::{into_rows, print_rows, OutputFormat};

/// Arguments for the Exec command
#[derive(Args)]
pub struct ExecArgs {
    /// SQL statement to execute
    #[clap()]
    pub sql: String,

    /// Positional parameter value (?1, ?2, ...), may be repeated
    #[clap(short, long = "param")]
    pub params: Vec<String>,
}

pub fn run(config: &ExecFilterConfig, args: ExecArgs, output_format: OutputFormat) -> Result<()> {
    match execute(config, &args)? {
        Value::Number(changed) => println!("{} row(s) changed", changed),
        Value::Null => println!("0 row(s) changed"),
        mocked => print_rows(&into_rows(mocked), output_format),
    }
    Ok(())
}

/// Run the statement through the configured filter chain
///
/// A real execution yields the changed row count; a configured mock yields
/// its canned JSON value.
fn execute(config: &ExecFilterConfig, args: &ExecArgs) -> Result<Value> {
    let (db, ctx) = super::open(config)?;
    ctx.exec(&db, |cmd| {
        cmd.execute(&args.sql, params_from_iter(args.params.iter()))
            .map(Value::from)
    })
}
