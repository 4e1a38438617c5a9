use clap::{Parser, Subcommand};
use execfilter::ExecFilterConfig;
use tracing::Level;

mod commands;

use commands::exec::ExecArgs;
use commands::output::OutputFormat;
use commands::query::QueryArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.execfilter/execfilter.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// SQLite database file, overrides the configured path
    #[clap(long)]
    db: Option<String>,

    /// Run every statement N times against one command
    #[clap(short, long)]
    replay: Option<usize>,

    /// Log every execution
    #[clap(long)]
    audit: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a statement and print the number of changed rows (or the mocked result)
    Exec(ExecArgs),

    /// Run a query and print the returned rows
    Query(QueryArgs),

    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let mut config = match ExecFilterConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }
    if let Some(replay) = cli.replay {
        config.replay_count = replay;
    }
    if cli.audit {
        config.audit = true;
    }

    let result = match cli.command {
        Commands::Exec(args) => commands::exec::run(&config, args, cli.format),
        Commands::Query(args) => commands::query::run(&config, args, cli.format),
        Commands::Config => commands::config::run(&config, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
