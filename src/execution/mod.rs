//! Query executor.
//!
//! Takes a parsed [`Query`] and drives a [`TableSource`] and the
//! [`Relation`] primitives through a fixed pipeline:
//!
//! 1. load the source and normalize every column
//! 2. filter by the `WHERE` predicate, evaluated into a [`Mask`]
//! 3. project onto the `SELECT` columns
//! 4. sort by the `ORDER BY` column
//! 5. truncate to `LIMIT` rows
//!
//! Each stage fails fast; a missing column is reported with the columns the
//! relation did have at that point.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::Result;
use crate::sql::{BoolOp, Comparison, ComparisonOp, Expr, Query};
use crate::storage::{Mask, Relation, TableSource};
use crate::types::Value;

/// Runs queries against a [`TableSource`].
#[derive(Debug, Clone)]
pub struct Executor<S> {
    source: S,
    thousands_separator: char,
}

impl<S: TableSource> Executor<S> {
    /// An executor stripping `,` as the thousands separator.
    pub fn new(source: S) -> Self {
        Executor {
            source,
            thousands_separator: ',',
        }
    }

    pub fn with_thousands_separator(mut self, separator: char) -> Self {
        self.thousands_separator = separator;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Execute `query` and return the result relation.
    pub fn execute(&self, query: &Query) -> Result<Relation> {
        let mut relation = self.source.load(&query.from.filename)?;
        relation.normalize(self.thousands_separator);
        debug!(
            source = %query.from.filename,
            rows = relation.len(),
            columns = relation.width(),
            "load"
        );

        if let Some(predicate) = &query.where_clause {
            for column in predicate.columns() {
                relation.require_column(column)?;
            }
            let mask = evaluate(predicate, &relation)?;
            debug!(selected = mask.count_selected(), of = mask.len(), "filter");
            relation = relation.filter(&mask)?;
        }

        relation = relation.project(&query.select.columns)?;
        debug!(columns = ?query.select.columns, "project");

        if let Some(order) = &query.order_by {
            relation = relation.sort(&order.column, order.ascending)?;
            debug!(column = %order.column, ascending = order.ascending, "sort");
        }

        if let Some(limit) = &query.limit {
            let n = usize::try_from(limit.count).unwrap_or(usize::MAX);
            relation = relation.head(n);
            debug!(limit = limit.count, rows = relation.len(), "limit");
        }

        Ok(relation)
    }
}

/// Evaluate a predicate into a mask aligned with `relation`.
///
/// `AND` intersects the two child masks and `OR` unions them. Both sides are
/// always evaluated, so a missing column is reported even when the other
/// side alone would decide every row.
pub fn evaluate(expr: &Expr, relation: &Relation) -> Result<Mask> {
    match expr {
        Expr::Comparison(cmp) => evaluate_comparison(cmp, relation),
        Expr::BooleanOp { op, left, right } => {
            let left = evaluate(left, relation)?;
            let right = evaluate(right, relation)?;
            match op {
                BoolOp::And => left.and(&right),
                BoolOp::Or => left.or(&right),
            }
        }
    }
}

fn evaluate_comparison(cmp: &Comparison, relation: &Relation) -> Result<Mask> {
    let index = relation.require_column(&cmp.left.name)?;
    let literal = cmp.right.value.to_value();
    Ok(relation
        .column(index)
        .map(|cell| compare(cell, cmp.op, &literal))
        .collect())
}

/// Apply one comparison operator.
///
/// Numbers compare with numbers and text with text. Any other pairing,
/// including `Null`, is incomparable: it satisfies `!=` and nothing else.
pub fn compare(cell: &Value, op: ComparisonOp, literal: &Value) -> bool {
    let ord = cell.compare(literal);
    match op {
        ComparisonOp::Eq => ord == Some(Ordering::Equal),
        ComparisonOp::NotEq => ord != Some(Ordering::Equal),
        ComparisonOp::Lt => ord == Some(Ordering::Less),
        ComparisonOp::LtEq => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        ComparisonOp::Gt => ord == Some(Ordering::Greater),
        ComparisonOp::GtEq => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
    }
}
