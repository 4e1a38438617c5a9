use anyhow::Result;
use execfilter::{ExecFilterConfig, MockEntry};
use serde::Serialize;
use std::path::Path;

use super::output::OutputFormat;

#[derive(Debug, Serialize)]
struct ConfigInfo<'a> {
    config_file: String,
    data_dir: &'a str,
    database: DatabaseInfo,
    replay_count: usize,
    audit: bool,
    mocks: &'a [MockEntry],
}

#[derive(Debug, Serialize)]
struct DatabaseInfo {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
}

pub fn run(config: &ExecFilterConfig, output_format: OutputFormat) -> Result<()> {
    let sqlite_path = config.sqlite_path();
    let sqlite_exists = Path::new(&sqlite_path).exists();
    let size_bytes = if sqlite_exists {
        std::fs::metadata(&sqlite_path).ok().map(|m| m.len())
    } else {
        None
    };

    if output_format.is_json() {
        let info = ConfigInfo {
            config_file: ExecFilterConfig::config_file_path(),
            data_dir: &config.data_dir,
            database: DatabaseInfo {
                path: sqlite_path,
                exists: sqlite_exists,
                size_bytes,
            },
            replay_count: config.replay_count,
            audit: config.audit,
            mocks: &config.mocks,
        };
        let json = match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&info)?,
            _ => serde_json::to_string(&info)?,
        };
        println!("{}", json);
        return Ok(());
    }

    println!("Config File:        {}", ExecFilterConfig::config_file_path());
    println!("{}", config.summary());
    match size_bytes {
        Some(size) => println!("Database Size:      {} bytes", size),
        None => println!("Database Size:      (not created)"),
    }
    Ok(())
}
