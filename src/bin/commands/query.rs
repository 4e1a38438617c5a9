use anyhow::Result;
use clap::Args;
use execfilter::{Command, ExecFilterConfig};
use rusqlite::params_from_iter;
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};

use super::output::{into_rows, print_rows, OutputFormat};

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// SQL query to run
    #[clap()]
    pub sql: String,

    /// Positional parameter value (?1, ?2, ...), may be repeated
    #[clap(short, long = "param")]
    pub params: Vec<String>,
}

pub fn run(config: &ExecFilterConfig, args: QueryArgs, output_format: OutputFormat) -> Result<()> {
    let rows = fetch(config, &args)?;
    print_rows(&rows, output_format);
    Ok(())
}

/// Run the query through the configured filter chain and collect its rows
fn fetch(config: &ExecFilterConfig, args: &QueryArgs) -> Result<Vec<Value>> {
    let (db, ctx) = super::open(config)?;

    // mocks configured in TOML produce JSON, so the query result is JSON too
    let result: Value = ctx.exec(&db, |cmd| query_json(cmd, &args.sql, &args.params))?;
    Ok(into_rows(result))
}

fn query_json(cmd: &mut Command<'_>, sql: &str, params: &[String]) -> Result<Value> {
    let rows = cmd.with_statement(sql, |stmt| {
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut obj = Map::new();
            for (i, name) in columns.iter().enumerate() {
                obj.insert(name.clone(), to_json(row.get_ref(i)?));
            }
            out.push(Value::Object(obj));
        }
        Ok(out)
    })?;
    Ok(Value::Array(rows))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).to_string()),
        ValueRef::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execfilter::{DatabaseConn, MockEntry};
    use serde_json::json;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, replay_count: usize, mocks: Vec<MockEntry>) -> ExecFilterConfig {
        ExecFilterConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            database_path: Some(dir.path().join("query.sqlite3").to_string_lossy().to_string()),
            replay_count,
            audit: false,
            mocks,
        }
    }

    fn query_args(sql: &str) -> QueryArgs {
        QueryArgs {
            sql: sql.to_string(),
            params: vec![],
        }
    }

    fn seed(config: &ExecFilterConfig) {
        let db = DatabaseConn::open(config.database_path.as_deref()).unwrap();
        db.conn
            .execute_batch(
                "CREATE TABLE person (name TEXT, age INTEGER);
                 INSERT INTO person VALUES ('Ada', 36);
                 INSERT INTO person VALUES ('Linus', NULL);",
            )
            .unwrap();
    }

    #[test]
    fn test_query_json_keeps_column_order() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let mut cmd = db.create_command();
        let sql = "SELECT ?1 AS zeta, 2 AS alpha, 1.5 AS mid, NULL AS missing";
        let value = query_json(&mut cmd, sql, &["x".to_string()]).unwrap();
        assert_eq!(cmd.last_sql(), Some(sql));
        cmd.dispose();

        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<&str> = rows[0].as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid", "missing"]);
        assert_eq!(
            rows[0],
            json!({ "zeta": "x", "alpha": 2, "mid": 1.5, "missing": null })
        );
    }

    #[test]
    fn test_fetch_returns_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 1, vec![]);
        seed(&config);

        let rows = fetch(&config, &query_args("SELECT name, age FROM person ORDER BY name")).unwrap();
        assert_eq!(
            rows,
            vec![
                json!({ "name": "Ada", "age": 36 }),
                json!({ "name": "Linus", "age": null }),
            ]
        );
        assert!(run(&config, query_args("SELECT * FROM person"), OutputFormat::Psv).is_ok());
    }

    #[test]
    fn test_fetch_under_replay_returns_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir, 4, vec![]);
        seed(&config);

        let rows = fetch(&config, &query_args("SELECT COUNT(*) AS n FROM person")).unwrap();
        assert_eq!(rows, vec![json!({ "n": 2 })]);

        let none = fetch(&config_in(&dir, 0, vec![]), &query_args("SELECT * FROM person")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_config_mock_answers_query() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            &dir,
            1,
            vec![MockEntry {
                sql: "exec sp_people".to_string(),
                result: json!([{ "first_name": "Mocked" }, { "first_name": "Again" }]),
            }],
        );

        let rows = fetch(&config, &query_args("exec sp_people")).unwrap();
        assert_eq!(
            rows,
            vec![json!({ "first_name": "Mocked" }), json!({ "first_name": "Again" })]
        );
        assert!(fetch(&config, &query_args("exec sp_People")).is_err());
    }
}
