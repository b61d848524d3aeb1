//! # csvql
//!
//! A small query compiler for delimited text files.
//!
//! ```text
//! FROM "students.csv"
//! SELECT name, score
//! WHERE score >= 80 AND city = "Bandung"
//! ORDER BY score DESC
//! LIMIT 10
//! ```
//!
//! Query text goes through the [`sql`] lexer and recursive-descent parser to
//! produce a [`Query`], which the [`execution`] module evaluates against a
//! [`storage::TableSource`] to produce a [`Relation`].
//!
//! ```no_run
//! use csvql::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default());
//! let result = engine.query(r#"FROM "students.csv" SELECT name WHERE score > 80"#)?;
//! println!("{} rows", result.len());
//! # Ok::<(), csvql::QueryError>(())
//! ```

pub mod error;
pub mod types;
pub mod sql;
pub mod storage;
pub mod execution;

pub use error::{ErrorKind, QueryError, Result};
pub use sql::Query;
pub use storage::{CsvOptions, CsvSource, MemorySource, Relation, TableSource};
pub use types::Value;

use std::path::PathBuf;

use execution::Executor;

/// Configuration for an [`Engine`] reading from disk.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub csv: CsvOptions,
    /// Directory relative `FROM` names are resolved against.
    pub base_dir: Option<PathBuf>,
}

/// Compiles and runs queries. Each query loads a fresh copy of its source.
#[derive(Debug, Clone)]
pub struct Engine<S = CsvSource> {
    executor: Executor<S>,
}

impl Engine<CsvSource> {
    /// An engine reading delimited files from disk.
    pub fn new(config: EngineConfig) -> Self {
        let separator = config.csv.thousands_separator;
        let mut source = CsvSource::new(config.csv);
        if let Some(dir) = config.base_dir {
            source = source.with_base_dir(dir);
        }
        Engine {
            executor: Executor::new(source).with_thousands_separator(separator),
        }
    }
}

impl<S: TableSource> Engine<S> {
    /// An engine over any source, with `,` as the thousands separator.
    pub fn with_source(source: S) -> Self {
        Engine {
            executor: Executor::new(source),
        }
    }

    pub fn with_thousands_separator(mut self, separator: char) -> Self {
        self.executor = self.executor.with_thousands_separator(separator);
        self
    }

    pub fn source(&self) -> &S {
        self.executor.source()
    }

    /// Tokenize and parse without touching any source.
    pub fn compile(&self, text: &str) -> Result<Query> {
        sql::parse(text)
    }

    pub fn execute(&self, query: &Query) -> Result<Relation> {
        self.executor.execute(query)
    }

    /// Compile and execute in one step.
    pub fn query(&self, text: &str) -> Result<Relation> {
        let query = self.compile(text)?;
        self.execute(&query)
    }
}
