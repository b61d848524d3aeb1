//! # csvql CLI
//!
//! Runs a query from a file, from `--execute`, or interactively.

mod error;
mod output;
mod repl;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use csvql::{CsvOptions, Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

use crate::error::{CliError, Result};
use crate::output::format_relation;
use crate::repl::Repl;

/// Query CSV files with a small SQL dialect.
///
/// With no QUERY_FILE and no --execute, starts an interactive session.
#[derive(Parser, Debug)]
#[command(name = "csvql", version, about)]
pub struct Cli {
    /// File containing a single query
    pub query_file: Option<PathBuf>,

    /// Run this query text instead of reading a file
    #[arg(short, long, conflicts_with = "query_file")]
    pub execute: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Field delimiter of the source files (a single ASCII character, or "\t")
    #[arg(short, long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Digit-grouping character stripped from cells before numeric conversion
    #[arg(long, default_value = ",")]
    pub thousands_separator: char,

    /// Keep leading and trailing whitespace in cells
    #[arg(long)]
    pub no_trim: bool,

    /// Directory relative FROM paths are resolved against
    #[arg(short = 'C', long, env = "CSVQL_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Print the parsed query in canonical form before running it
    #[arg(long)]
    pub show_ast: bool,

    /// Log pipeline stages to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for result relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Bordered table with a row count
    Table,
    /// Comma-separated values with a header row
    Csv,
    /// Array of objects keyed by column
    Json,
}

fn parse_delimiter(s: &str) -> std::result::Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ASCII character, got {s:?}")),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "csvql=debug" } else { "csvql=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = EngineConfig {
        csv: CsvOptions {
            delimiter: cli.delimiter,
            thousands_separator: cli.thousands_separator,
            trim: !cli.no_trim,
        },
        base_dir: cli.base_dir.clone(),
    };
    let engine = Engine::new(config);

    let text = match (&cli.execute, &cli.query_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_query_file(path)?,
        (None, None) => {
            return Repl::new(engine, cli.format, cli.show_ast)?.run();
        }
    };

    if text.trim().is_empty() {
        return Err(CliError::InvalidInput("query is empty".into()));
    }

    let query = engine.compile(&text)?;
    if cli.show_ast {
        println!("{query}");
    }
    let result = engine.execute(&query)?;
    println!("{}", format_relation(&result, cli.format)?);
    Ok(())
}

fn read_query_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(CliError::QueryFileNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}
