//! Loading delimited text files into [`Relation`]s.
//!
//! The first record is the header. Header names are made unique the way
//! spreadsheet tools do it: a repeated `name` becomes `name.1`, `name.2`, and
//! an empty header cell becomes `Unnamed: <index>`. Empty data cells load as
//! [`Value::Null`]; every other cell loads as text and is left for
//! [`Relation::normalize`] to reinterpret.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Relation, TableSource};
use crate::error::{QueryError, Result};
use crate::types::Value;

/// Parsing options for delimited sources.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Digit-grouping character stripped during normalization.
    pub thousands_separator: char,
    /// Trim surrounding whitespace from headers and cells.
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            thousands_separator: ',',
            trim: true,
        }
    }
}

/// A [`TableSource`] reading delimited files from disk.
///
/// Relative names are resolved against `base_dir` when one is set, and
/// against the process working directory otherwise.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    base_dir: Option<PathBuf>,
    options: CsvOptions,
}

impl CsvSource {
    pub fn new(options: CsvOptions) -> Self {
        CsvSource {
            base_dir: None,
            options,
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// The path a `FROM` name refers to.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl TableSource for CsvSource {
    fn load(&self, name: &str) -> Result<Relation> {
        read_csv_file(&self.resolve(name), &self.options)
    }
}

/// Read a delimited file into a relation of raw text cells.
pub fn read_csv_file(path: &Path, options: &CsvOptions) -> Result<Relation> {
    if !path.is_file() {
        return Err(QueryError::SourceNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let relation = read_csv(file, options)?;
    debug!(
        path = %path.display(),
        rows = relation.len(),
        columns = relation.width(),
        "loaded source"
    );
    Ok(relation)
}

/// Read delimited text from any reader. Ragged rows are an error.
pub fn read_csv<R: Read>(reader: R, options: &CsvOptions) -> Result<Relation> {
    let trim = if options.trim {
        csv::Trim::All
    } else {
        csv::Trim::None
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .trim(trim)
        .from_reader(reader);

    let columns = unique_headers(reader.headers()?.iter());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(cell_value).collect());
    }
    Ok(Relation::new(columns, rows))
}

fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        Value::Null
    } else {
        Value::Text(cell.to_string())
    }
}

fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (index, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {index}")
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}
