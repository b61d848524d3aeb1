//! In-memory relations and the sources that produce them.
//!
//! A [`Relation`] is a named, ordered set of columns over row-major
//! [`Value`] cells. It provides the primitives the executor drives:
//! normalization, filter-by-[`Mask`], projection, sorting and truncation.
//! Every primitive that names a column fails with
//! [`QueryError::ColumnNotFound`] when the column is absent.
//!
//! Relations are obtained through the [`TableSource`] trait. The CSV-backed
//! implementation lives in [`loader`]; [`MemorySource`] serves pre-built
//! relations.

pub mod loader;

pub use loader::{CsvOptions, CsvSource};

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{QueryError, Result};
use crate::types::Value;

// ---------------------------------------------------------------------------
// TableSource
// ---------------------------------------------------------------------------

/// Something that can load a relation by the name used in `FROM`.
pub trait TableSource {
    fn load(&self, name: &str) -> Result<Relation>;
}

/// A [`TableSource`] backed by relations held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    tables: HashMap<String, Relation>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `relation` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, relation: Relation) {
        self.tables.insert(name.into(), relation);
    }

    pub fn with_table(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.insert(name, relation);
        self
    }
}

impl TableSource for MemorySource {
    /// Returns a fresh copy so each query works on its own relation.
    fn load(&self, name: &str) -> Result<Relation> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::SourceNotFound(PathBuf::from(name)))
    }
}

// ---------------------------------------------------------------------------
// Mask
// ---------------------------------------------------------------------------

/// A row-selection vector aligned with a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(Vec<bool>);

impl Mask {
    /// A mask selecting every one of `len` rows.
    pub fn all(len: usize) -> Self {
        Mask(vec![true; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of selected rows.
    pub fn count_selected(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Elementwise AND (intersection of the two selections).
    pub fn and(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a && b)
    }

    /// Elementwise OR (union of the two selections).
    pub fn or(&self, other: &Mask) -> Result<Mask> {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &Mask, f: impl Fn(bool, bool) -> bool) -> Result<Mask> {
        if self.len() != other.len() {
            return Err(QueryError::MaskLength {
                expected: self.len(),
                actual: other.len(),
            });
        }
        Ok(self.0.iter().zip(&other.0).map(|(&a, &b)| f(a, b)).collect())
    }
}

impl FromIterator<bool> for Mask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Mask(iter.into_iter().collect())
    }
}

impl From<Vec<bool>> for Mask {
    fn from(bits: Vec<bool>) -> Self {
        Mask(bits)
    }
}

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// An in-memory table: ordered column names over row-major cells.
///
/// Every row has exactly one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Relation {
    /// Build a relation from column names and rows.
    ///
    /// # Panics
    ///
    /// Panics if any row's width differs from the number of columns.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        assert!(
            rows.iter().all(|r| r.len() == columns.len()),
            "every row must have one cell per column"
        );
        Relation { columns, rows }
    }

    /// Convenience constructor from string slices, mostly for tests.
    pub fn from_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<Value>>) -> Self {
        Relation::new(columns.iter().map(|c| c.as_ref().to_string()).collect(), rows)
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Column names are matched exactly, including case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`column_index`](Self::column_index) but fails with the list of
    /// available columns.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| QueryError::ColumnNotFound {
            column: name.to_string(),
            available: self.columns.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// The cell at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Iterate over one column's cells, top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |r| &r[index])
    }

    // -- normalization ------------------------------------------------------

    /// Strip `separator` from every text cell of every column and reinterpret
    /// each column as numeric where possible.
    pub fn normalize(&mut self, separator: char) {
        for index in 0..self.width() {
            self.normalize_column(index, separator);
        }
    }

    /// Normalize a single column.
    ///
    /// Text cells lose every `separator` character. If every non-null cell
    /// then parses as a number the column becomes numeric: Integer when all
    /// cells are whole numbers, Real otherwise. A column with any
    /// non-numeric cell stays text, keeping the stripped form.
    pub fn normalize_column(&mut self, index: usize, separator: char) {
        let mut parsed = Vec::with_capacity(self.rows.len());
        let mut numeric = true;
        let mut any_real = false;

        for row in &mut self.rows {
            let cell = &mut row[index];
            if let Value::Text(s) = cell {
                if s.contains(separator) {
                    s.retain(|c| c != separator);
                }
            }
            if !numeric {
                continue;
            }
            let value = match cell {
                Value::Null => Value::Null,
                Value::Text(s) => match Value::coerce_numeric(s) {
                    Some(v) => v,
                    None => {
                        numeric = false;
                        continue;
                    }
                },
                other => other.clone(),
            };
            any_real |= matches!(value, Value::Real(_));
            parsed.push(value);
        }

        if !numeric {
            return;
        }
        for (row, value) in self.rows.iter_mut().zip(parsed) {
            row[index] = match value {
                Value::Integer(i) if any_real => Value::Real(i as f64),
                v => v,
            };
        }
    }

    // -- relational primitives ---------------------------------------------

    /// Keep the rows whose mask bit is set, preserving order.
    pub fn filter(self, mask: &Mask) -> Result<Relation> {
        if mask.len() != self.rows.len() {
            return Err(QueryError::MaskLength {
                expected: self.rows.len(),
                actual: mask.len(),
            });
        }
        let rows = self
            .rows
            .into_iter()
            .zip(mask.as_slice())
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect();
        Ok(Relation {
            columns: self.columns,
            rows,
        })
    }

    /// Restrict to `columns`, in the given order.
    ///
    /// Every column is checked before any work is done.
    pub fn project<S: AsRef<str>>(self, columns: &[S]) -> Result<Relation> {
        let indices = columns
            .iter()
            .map(|c| self.require_column(c.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Relation {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        })
    }

    /// Stable sort by one column. `Null` cells go last in either direction.
    pub fn sort(mut self, column: &str, ascending: bool) -> Result<Relation> {
        let index = self.require_column(column)?;
        self.rows.sort_by(|a, b| {
            let (x, y) = (&a[index], &b[index]);
            match (x.is_null(), y.is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => {
                    let ord = x.sort_cmp(y);
                    if ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                }
            }
        });
        Ok(self)
    }

    /// Keep at most the first `n` rows.
    pub fn head(mut self, n: usize) -> Relation {
        self.rows.truncate(n);
        self
    }
}
