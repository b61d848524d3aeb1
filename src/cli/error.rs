//! Error types for the command-line front end.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Any failure from compiling or running a query.
    #[error("{0}")]
    Query(#[from] csvql::QueryError),

    #[error("query file not found: {0}")]
    QueryFileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("REPL error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
