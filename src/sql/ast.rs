//! Abstract syntax tree definitions for csvql queries.
//!
//! A parsed query is a [`Query`]; its optional `WHERE` predicate is a tree of
//! [`Expr`] nodes. Column names are opaque strings here: they are resolved
//! against the loaded relation by the executor, never by the parser.
//!
//! Every node implements `Display` with a canonical rendering that parses
//! back to a structurally identical tree.

use std::fmt;

use crate::types::Value;

/// A complete query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub from: FromClause,
    pub select: SelectClause,
    pub where_clause: Option<Expr>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<LimitClause>,
}

/// `FROM "<filename>"`.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub filename: String,
}

/// `SELECT a, b, ...`. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub columns: Vec<String>,
}

/// `ORDER BY <column> [ASC|DESC]`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub ascending: bool,
}

/// `LIMIT <count>`.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A boolean predicate over the rows of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison(Comparison),
    BooleanOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Expr {
        Expr::BooleanOp {
            op: BoolOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Expr {
        Expr::BooleanOp {
            op: BoolOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Every column name the predicate references, in source order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Comparison(cmp) => out.push(&cmp.left.name),
            Expr::BooleanOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }
}

/// `<column> <op> <literal>`. The column is always on the left.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: ColumnRef,
    pub op: ComparisonOp,
    pub right: Literal,
}

impl Comparison {
    pub fn new(column: impl Into<String>, op: ComparisonOp, value: LiteralValue) -> Self {
        Comparison {
            left: ColumnRef { name: column.into() },
            op,
            right: Literal { value },
        }
    }
}

impl From<Comparison> for Expr {
    fn from(cmp: Comparison) -> Self {
        Expr::Comparison(cmp)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
}

/// A literal scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Real(f64),
    String(String),
}

impl LiteralValue {
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::Integer(i) => Value::Integer(*i),
            LiteralValue::Real(r) => Value::Real(*r),
            LiteralValue::String(s) => Value::Text(s.clone()),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

// ---------------------------------------------------------------------------
// Canonical rendering
// ---------------------------------------------------------------------------

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.from, self.select)?;
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {}", expr)?;
        }
        if let Some(order) = &self.order_by {
            write!(f, " {}", order)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit.count)?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM \"{}\"", self.filename)
    }
}

impl fmt::Display for SelectClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {}", self.columns.join(", "))
    }
}

impl fmt::Display for OrderByClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "ORDER BY {} {}", self.column, dir)
    }
}

impl fmt::Display for Expr {
    /// Boolean nodes are always parenthesized so the grouping survives a
    /// re-parse regardless of precedence.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison(cmp) => write!(f, "{}", cmp),
            Expr::BooleanOp { op, left, right } => {
                let op = match op {
                    BoolOp::And => "AND",
                    BoolOp::Or => "OR",
                };
                write!(f, "({} {} {})", left, op, right)
            }
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left.name, self.op.symbol(), self.right.value)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Integer(i) => write!(f, "{}", i),
            // A decimal point keeps the literal a Real when re-lexed.
            LiteralValue::Real(r) if r.fract() == 0.0 => write!(f, "{:.1}", r),
            LiteralValue::Real(r) => write!(f, "{}", r),
            LiteralValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(col: &str, op: ComparisonOp, v: LiteralValue) -> Expr {
        Comparison::new(col, op, v).into()
    }

    #[test]
    fn boolean_tree_nesting() {
        // a = 1 OR (b = 2 AND c = 3)
        let expr = Expr::or(
            cmp("a", ComparisonOp::Eq, LiteralValue::Integer(1)),
            Expr::and(
                cmp("b", ComparisonOp::Eq, LiteralValue::Integer(2)),
                cmp("c", ComparisonOp::Eq, LiteralValue::Integer(3)),
            ),
        );
        if let Expr::BooleanOp { op, right, .. } = &expr {
            assert_eq!(*op, BoolOp::Or);
            assert!(matches!(**right, Expr::BooleanOp { op: BoolOp::And, .. }));
        } else {
            panic!("expected BooleanOp");
        }
        assert_eq!(expr.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn literal_to_value() {
        assert_eq!(LiteralValue::Integer(3).to_value(), Value::Integer(3));
        assert_eq!(LiteralValue::Real(2.5).to_value(), Value::Real(2.5));
        assert_eq!(
            LiteralValue::String("Bandung".into()).to_value(),
            Value::Text("Bandung".into())
        );
    }

    #[test]
    fn literal_display_keeps_kind() {
        assert_eq!(LiteralValue::Integer(80).to_string(), "80");
        assert_eq!(LiteralValue::Real(80.0).to_string(), "80.0");
        assert_eq!(LiteralValue::Real(0.25).to_string(), "0.25");
        assert_eq!(LiteralValue::String("x".into()).to_string(), "\"x\"");
    }

    #[test]
    fn query_display_is_canonical() {
        let query = Query {
            from: FromClause { filename: "x.csv".into() },
            select: SelectClause { columns: vec!["name".into(), "score".into()] },
            where_clause: Some(Expr::and(
                cmp("score", ComparisonOp::GtEq, LiteralValue::Integer(80)),
                cmp("city", ComparisonOp::Eq, LiteralValue::String("Bandung".into())),
            )),
            order_by: Some(OrderByClause { column: "score".into(), ascending: false }),
            limit: Some(LimitClause { count: 10 }),
        };
        assert_eq!(
            query.to_string(),
            "FROM \"x.csv\" SELECT name, score WHERE (score >= 80 AND city = \"Bandung\") ORDER BY score DESC LIMIT 10"
        );
    }

    #[test]
    fn minimal_query_display() {
        let query = Query {
            from: FromClause { filename: "a.csv".into() },
            select: SelectClause { columns: vec!["a".into()] },
            where_clause: None,
            order_by: None,
            limit: None,
        };
        assert_eq!(query.to_string(), "FROM \"a.csv\" SELECT a");
    }
}
