use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format for query results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    Markdown,
    /// Compact JSON array
    Json,
    JsonPretty,
    /// One JSON object per line
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    pub fn all_names() -> &'static [&'static str] {
        &["table", "markdown", "json", "json-pretty", "json-line", "psv"]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::JsonLine => "json-line",
            Self::Psv => "psv",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonline" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Column names in order of first appearance across all rows
fn columns(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        match row {
            Value::Object(obj) => {
                for key in obj.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => {
                if !columns.iter().any(|c| c == "value") {
                    columns.push("value".to_string());
                }
            }
        }
    }
    columns
}

fn cell(row: &Value, column: &str) -> String {
    let value = match row {
        Value::Object(obj) => obj.get(column).unwrap_or(&Value::Null),
        other if column == "value" => other,
        _ => &Value::Null,
    };
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows of a statement result: arrays as-is, null as empty, anything else as one row
pub fn into_rows(value: Value) -> Vec<Value> {
    match value {
        Value::Array(rows) => rows,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

pub fn print_rows(rows: &[Value], output_format: OutputFormat) {
    match output_format {
        OutputFormat::Table | OutputFormat::Markdown => {
            let columns = columns(rows);
            let mut builder = Builder::default();
            builder.push_record(columns.clone());
            for row in rows {
                builder.push_record(columns.iter().map(|c| cell(row, c)));
            }
            let mut table = builder.build();
            if output_format == OutputFormat::Table {
                table.with(Style::rounded());
            } else {
                table.with(Style::markdown());
            }
            println!("{}", table);
        }
        OutputFormat::Json => match serde_json::to_string(rows) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(rows) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
        },
        OutputFormat::JsonLine => {
            for row in rows {
                println!("{}", row);
            }
        }
        OutputFormat::Psv => {
            let columns = columns(rows);
            println!("{}", columns.join("|"));
            for row in rows {
                let cells: Vec<String> = columns.iter().map(|c| cell(row, c)).collect();
                println!("{}", cells.join("|"));
            }
        }
    }
}
