//! Unified error handling for csvql.
//!
//! This module defines [`QueryError`], the single error type propagated
//! through every stage of the query pipeline: the lexer, the parser, the
//! source loader and the executor.
//!
//! A convenience [`Result<T>`] type alias is re-exported so that callers can
//! write `Result<T>` instead of `std::result::Result<T, QueryError>`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The canonical error type for all csvql operations.
///
/// Variants are organised by pipeline stage so that callers can match on
/// the error category (see [`QueryError::kind`]) without inspecting
/// free-form strings.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A character that starts no token was found in the query text.
    #[error("unexpected character {ch:?} at line {line}, column {column}")]
    UnexpectedCharacter { ch: char, line: usize, column: usize },

    /// A string literal was opened but never closed.
    #[error("unterminated string literal at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    /// The parser wanted one kind of token and found another.
    #[error("expected {expected} at line {line}, column {column}, got {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    /// The token stream ended in the middle of a clause.
    #[error("expected {expected} but reached end of input")]
    UnexpectedEnd { expected: String },

    /// A structurally complete query was followed by more tokens.
    #[error("unexpected token {found} at line {line}, column {column}")]
    TrailingToken {
        found: String,
        line: usize,
        column: usize,
    },

    /// A numeric literal could not be represented by its target type.
    #[error("invalid literal {text:?} at line {line}, column {column}: {reason}")]
    InvalidLiteral {
        text: String,
        line: usize,
        column: usize,
        reason: String,
    },

    /// A `WHERE` clause nests or chains beyond the parser's limits.
    #[error("too many {what} (limit {limit}) at line {line}, column {column}")]
    ExpressionTooDeep {
        what: &'static str,
        limit: usize,
        line: usize,
        column: usize,
    },

    /// The query references a column the loaded relation does not have.
    #[error("column \"{column}\" not found. Available columns: [{}]", .available.join(", "))]
    ColumnNotFound {
        column: String,
        available: Vec<String>,
    },

    /// The source named in `FROM` does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source exists but is not a well-formed delimited file.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O error originating from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A row-selection mask did not line up with the relation it filters.
    /// This indicates a bug in the executor.
    #[error("internal error: mask of length {actual} applied to {expected} rows")]
    MaskLength { expected: usize, actual: usize },
}

/// Coarse classification of a [`QueryError`], one per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    SourceLoad,
    Internal,
}

impl QueryError {
    /// The pipeline stage that produced this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::UnexpectedCharacter { .. } | QueryError::UnterminatedString { .. } => {
                ErrorKind::Lexical
            }
            QueryError::UnexpectedToken { .. }
            | QueryError::UnexpectedEnd { .. }
            | QueryError::TrailingToken { .. }
            | QueryError::InvalidLiteral { .. }
            | QueryError::ExpressionTooDeep { .. } => ErrorKind::Syntax,
            QueryError::ColumnNotFound { .. } => ErrorKind::Semantic,
            QueryError::SourceNotFound(_) | QueryError::Csv(_) | QueryError::Io(_) => {
                ErrorKind::SourceLoad
            }
            QueryError::MaskLength { .. } => ErrorKind::Internal,
        }
    }
}

/// A specialised [`Result`] type for csvql operations.
pub type Result<T> = std::result::Result<T, QueryError>;
