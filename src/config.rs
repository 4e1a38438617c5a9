use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};

use crate::database::DbFactory;
use crate::filter::{AuditFilter, ExecFilter, MockFilter, PassThroughFilter, ReplayFilter};

/// A canned result returned when a failing command ran exactly `sql`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockEntry {
    pub sql: String,
    pub result: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecFilterConfig {
    /// Path to the directory holding execfilter's data
    pub data_dir: String,

    /// SQLite database file; defaults to `<data_dir>/execfilter.sqlite3`
    pub database_path: Option<String>,

    /// How many times each operation runs against its command (default: 1)
    pub replay_count: usize,

    /// Log every execution through the audit filter
    pub audit: bool,

    /// Stored-procedure mocks, matched on exact SQL text
    pub mocks: Vec<MockEntry>,
}

const EMPTY_CONFIG: &str = r#"### execfilter configuration file

### directory for data used by execfilter
# data_dir = "~/.execfilter"

### SQLite database file (default: <data_dir>/execfilter.sqlite3)
# database_path = "/tmp/execfilter.sqlite3"

### run every operation N times against one command (0 runs nothing)
# replay_count = 1

### log every execution
# audit = false

### canned results for failing commands whose SQL matches exactly
# [[mocks]]
# sql = "exec sp_name @firstName, @age"
# result = { first_name = "Mocked" }
"#;

/// Shape of the merged configuration sources
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    data_dir: Option<String>,
    database_path: Option<String>,
    replay_count: Option<usize>,
    audit: Option<bool>,
    mocks: Vec<MockEntry>,
}

fn home_dir_string() -> Result<String> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .to_str()
        .ok_or_else(|| anyhow!("Could not convert home directory path to string"))
        .map(|s| s.to_owned())
}

impl Default for ExecFilterConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.execfilter", home_dir),
            database_path: None,
            replay_count: 1,
            audit: false,
            mocks: Vec::new(),
        }
    }
}

impl ExecFilterConfig {
    /// Create and initialize a configuration
    ///
    /// Without an explicit path `$HOME/.execfilter/execfilter.toml` is used.
    /// A missing file is created from a commented template. Environment
    /// variables prefixed with `EXECFILTER_` (optionally from a `.env`
    /// file) override file values.
    pub fn new(path: &Option<String>) -> Result<ExecFilterConfig> {
        let file = match path {
            Some(p) => p.clone(),
            None => {
                let dir = format!("{}/.execfilter", home_dir_string()?);
                std::fs::create_dir_all(dir.as_str())
                    .map_err(|e| anyhow!("Unable to create execfilter directory: {}", e))?;
                format!("{}/execfilter.toml", dir)
            }
        };

        if !Path::new(file.as_str()).exists() {
            std::fs::write(file.as_str(), EMPTY_CONFIG)
                .map_err(|e| anyhow!("Unable to create config file {}: {}", file, e))?;
        }

        dotenvy::dotenv().ok();
        Self::load(Some(Path::new(file.as_str())))
    }

    /// Load configuration from an optional TOML file plus the environment
    ///
    /// Unlike [`ExecFilterConfig::new`] this never writes to disk.
    pub fn load(file: Option<&Path>) -> Result<ExecFilterConfig> {
        let mut builder = Config::builder();

        if let Some(file) = file {
            let path_str = file
                .to_str()
                .ok_or_else(|| anyhow!("Could not convert path to string"))?;
            builder = builder.add_source(config::File::with_name(path_str).required(false));
        }

        // E.g., `EXECFILTER_REPLAY_COUNT=3 execfilter exec ...` replays every statement
        builder = builder.add_source(
            config::Environment::with_prefix("EXECFILTER")
                .try_parsing(true)
                .ignore_empty(true),
        );

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> ExecFilterConfig {
        let defaults = ExecFilterConfig::default();
        ExecFilterConfig {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            database_path: raw.database_path,
            replay_count: raw.replay_count.unwrap_or(defaults.replay_count),
            audit: raw.audit.unwrap_or(defaults.audit),
            mocks: raw.mocks,
        }
    }

    /// Get the path to the SQLite database file
    pub fn sqlite_path(&self) -> String {
        match &self.database_path {
            Some(p) => p.clone(),
            None => {
                let data_dir = self.data_dir.trim_end_matches('/');
                format!("{}/execfilter.sqlite3", data_dir)
            }
        }
    }

    /// Connection provider for the configured database
    pub fn connection_provider(&self) -> DbFactory {
        DbFactory::new(Some(self.sqlite_path()))
    }

    /// Compose the configured filter chain
    ///
    /// Base filter (pass-through, or replay when `replay_count != 1`), then
    /// the mock layer when mocks are configured, then auditing when enabled.
    pub fn build_filter(&self) -> Arc<dyn ExecFilter> {
        let mut filter: Arc<dyn ExecFilter> = if self.replay_count == 1 {
            Arc::new(PassThroughFilter)
        } else {
            Arc::new(ReplayFilter::new(self.replay_count))
        };

        if !self.mocks.is_empty() {
            let mock = self
                .mocks
                .iter()
                .fold(MockFilter::wrapping(filter), |mock, entry| {
                    mock.on_sql_value(entry.sql.clone(), entry.result.clone())
                });
            filter = Arc::new(mock);
        }

        if self.audit {
            filter = Arc::new(AuditFilter::wrapping("execfilter", filter));
        }

        filter
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Data Directory:     {}", self.data_dir),
            format!("SQLite Path:        {}", self.sqlite_path()),
            format!("Replay Count:       {}", self.replay_count),
            format!("Audit:              {}", self.audit),
            format!("Mocks:              {}", self.mocks.len()),
        ];
        for mock in &self.mocks {
            lines.push(format!("  - {}", mock.sql));
        }
        lines.join("\n")
    }

    /// Get the default config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.execfilter/execfilter.toml", home_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ConnectionProvider, DatabaseConn};
    use crate::filter::ExecFilterExt;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("execfilter.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = ExecFilterConfig::load(None).unwrap();
        assert_eq!(config.replay_count, 1);
        assert!(!config.audit);
        assert!(config.mocks.is_empty());
        assert!(config.sqlite_path().ends_with("/execfilter.sqlite3"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
data_dir = "/tmp/ef-data/"
replay_count = 3
audit = true

[[mocks]]
sql = "exec sp_name @firstName, @age"
result = { first_name = "Mocked" }
"#,
        );

        let config = ExecFilterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.data_dir, "/tmp/ef-data/");
        assert_eq!(config.sqlite_path(), "/tmp/ef-data/execfilter.sqlite3");
        assert_eq!(config.replay_count, 3);
        assert!(config.audit);
        assert_eq!(config.mocks.len(), 1);
        assert_eq!(config.mocks[0].sql, "exec sp_name @firstName, @age");
        assert_eq!(config.mocks[0].result["first_name"], "Mocked");
    }

    #[test]
    fn test_new_creates_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.toml");
        let path_str = path.to_string_lossy().to_string();

        let config = ExecFilterConfig::new(&Some(path_str)).unwrap();
        assert!(path.exists());
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("### execfilter configuration file"));
        assert!(config.mocks.is_empty());
    }

    #[test]
    fn test_build_filter_chain() {
        let config = ExecFilterConfig {
            replay_count: 2,
            audit: true,
            mocks: vec![MockEntry {
                sql: "exec sp_answer".to_string(),
                result: serde_json::json!(42),
            }],
            ..Default::default()
        };

        let filter = config.build_filter();
        let debug = format!("{:?}", filter);
        assert!(debug.starts_with("AuditFilter"));
        assert!(debug.contains("MockFilter"));
        assert!(debug.contains("ReplayFilter { replay_count: 2 }"));

        let db = DatabaseConn::open_in_memory().unwrap();
        let value: serde_json::Value = filter
            .exec(&db, |cmd| {
                cmd.query_row("exec sp_answer", [], |row| row.get::<_, i64>(0))
                    .map(serde_json::Value::from)
            })
            .unwrap();
        assert_eq!(value, serde_json::json!(42));
    }

    #[test]
    fn test_plain_config_builds_pass_through() {
        let filter = ExecFilterConfig::default().build_filter();
        assert_eq!(format!("{:?}", filter), "PassThroughFilter");
    }

    #[test]
    fn test_connection_provider_uses_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cfg.sqlite3").to_string_lossy().to_string();
        let config = ExecFilterConfig {
            database_path: Some(db_path.clone()),
            ..Default::default()
        };

        let provider = config.connection_provider();
        assert_eq!(provider.path(), Some(db_path.as_str()));
        let db = provider.open_connection().unwrap();
        assert!(!db.table_exists("anything").unwrap());
    }
}
