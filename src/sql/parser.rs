//! Recursive-descent parser for csvql queries.
//!
//! The entry point is [`Parser::parse`], which tokenizes the input and then
//! parses exactly one query. Grammar, one method per production:
//!
//! ```text
//! query         := from_clause select_clause where_clause? order_clause? limit_clause?
//! from_clause   := FROM STRING
//! select_clause := SELECT IDENT (COMMA IDENT)*
//! where_clause  := WHERE bool_expr
//! order_clause  := ORDER BY IDENT (ASC | DESC)?
//! limit_clause  := LIMIT NUMBER
//! bool_expr     := bool_term (OR bool_term)*
//! bool_term     := bool_factor (AND bool_factor)*
//! bool_factor   := LPAREN bool_expr RPAREN | comparison
//! comparison    := IDENT comp_op (NUMBER | STRING)
//! ```

use tracing::{debug, warn};

use crate::error::{QueryError, Result};
use crate::sql::ast::*;
use crate::sql::lexer::{Lexer, Token, TokenKind};

/// Maximum number of `AND`/`OR` operators in one `WHERE` clause. This also
/// bounds the depth of the resulting [`Expr`] tree.
pub const MAX_EXPR_DEPTH: usize = 1000;

/// Maximum nesting of parenthesized groups.
pub const MAX_PARSER_DEPTH: usize = 256;

/// A recursive-descent parser over a borrowed token slice.
///
/// `pos` is the cursor into `tokens`. `depth` and `bool_ops` guard the
/// recursion limits above.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    bool_ops: usize,
}

impl<'a> Parser<'a> {
    /// Parse query text into a [`Query`].
    pub fn parse(text: &str) -> Result<Query> {
        let tokens = Lexer::new(text).tokenize()?;
        Parser::parse_tokens(&tokens)
    }

    /// Parse an already tokenized query. All tokens must be consumed.
    pub fn parse_tokens(tokens: &'a [Token]) -> Result<Query> {
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            bool_ops: 0,
        };
        let query = parser.parse_query()?;
        if let Some(tok) = parser.current() {
            return Err(QueryError::TrailingToken {
                found: tok.to_string(),
                line: tok.line,
                column: tok.column,
            });
        }
        debug!(query = %query, "parsed query");
        Ok(query)
    }

    // =======================================================================
    // Token helpers
    // =======================================================================

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Consume the current token if it is one of `kinds`; never consumes on
    /// mismatch.
    fn match_kind(&mut self, kinds: &[TokenKind]) -> Option<&'a Token> {
        match self.current() {
            Some(tok) if kinds.contains(&tok.kind) => self.advance(),
            _ => None,
        }
    }

    fn expect(&mut self, kinds: &[TokenKind]) -> Result<&'a Token> {
        if let Some(tok) = self.match_kind(kinds) {
            return Ok(tok);
        }
        let expected = kinds
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(match self.current() {
            Some(tok) => QueryError::UnexpectedToken {
                expected,
                found: tok.to_string(),
                line: tok.line,
                column: tok.column,
            },
            None => QueryError::UnexpectedEnd { expected },
        })
    }

    // =======================================================================
    // Clauses
    // =======================================================================

    fn parse_query(&mut self) -> Result<Query> {
        let from = self.parse_from_clause()?;
        let select = self.parse_select_clause()?;
        let where_clause = self.parse_where_clause()?;
        let order_by = self.parse_order_clause()?;
        let limit = self.parse_limit_clause()?;
        Ok(Query {
            from,
            select,
            where_clause,
            order_by,
            limit,
        })
    }

    fn parse_from_clause(&mut self) -> Result<FromClause> {
        self.expect(&[TokenKind::From])?;
        let filename = self.expect(&[TokenKind::String])?;
        Ok(FromClause {
            filename: filename.text.clone(),
        })
    }

    fn parse_select_clause(&mut self) -> Result<SelectClause> {
        self.expect(&[TokenKind::Select])?;
        let mut columns = vec![self.expect(&[TokenKind::Identifier])?.text.clone()];
        while self.match_kind(&[TokenKind::Comma]).is_some() {
            columns.push(self.expect(&[TokenKind::Identifier])?.text.clone());
        }
        Ok(SelectClause { columns })
    }

    fn parse_where_clause(&mut self) -> Result<Option<Expr>> {
        if self.match_kind(&[TokenKind::Where]).is_none() {
            return Ok(None);
        }
        Ok(Some(self.parse_bool_expr()?))
    }

    fn parse_order_clause(&mut self) -> Result<Option<OrderByClause>> {
        if self.match_kind(&[TokenKind::Order]).is_none() {
            return Ok(None);
        }
        self.expect(&[TokenKind::By])?;
        let column = self.expect(&[TokenKind::Identifier])?.text.clone();
        let ascending = match self.match_kind(&[TokenKind::Asc, TokenKind::Desc]) {
            Some(tok) => tok.kind == TokenKind::Asc,
            None => true,
        };
        Ok(Some(OrderByClause { column, ascending }))
    }

    fn parse_limit_clause(&mut self) -> Result<Option<LimitClause>> {
        if self.match_kind(&[TokenKind::Limit]).is_none() {
            return Ok(None);
        }
        let tok = self.expect(&[TokenKind::Number])?;
        // A fractional count is floored rather than rejected.
        let whole = match tok.text.split_once('.') {
            Some((whole, _)) => {
                warn!(limit = %tok.text, line = tok.line, column = tok.column, "fractional LIMIT truncated");
                whole
            }
            None => tok.text.as_str(),
        };
        let count = whole.parse::<u64>().map_err(|e| QueryError::InvalidLiteral {
            text: tok.text.clone(),
            line: tok.line,
            column: tok.column,
            reason: e.to_string(),
        })?;
        Ok(Some(LimitClause { count }))
    }

    // =======================================================================
    // Boolean expressions
    // =======================================================================
    //
    // Precedence (lowest to highest):
    //   1. OR
    //   2. AND
    //   3. parenthesized group / comparison

    fn parse_bool_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_bool_term()?;
        while let Some(op) = self.match_kind(&[TokenKind::Or]) {
            self.count_bool_op(op)?;
            let right = self.parse_bool_term()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_bool_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_bool_factor()?;
        while let Some(op) = self.match_kind(&[TokenKind::And]) {
            self.count_bool_op(op)?;
            let right = self.parse_bool_factor()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_bool_factor(&mut self) -> Result<Expr> {
        if let Some(paren) = self.match_kind(&[TokenKind::LeftParen]) {
            if self.depth == MAX_PARSER_DEPTH {
                return Err(too_deep("nested parenthesized groups", MAX_PARSER_DEPTH, paren));
            }
            self.depth += 1;
            let expr = self.parse_bool_expr()?;
            self.expect(&[TokenKind::RightParen])?;
            self.depth -= 1;
            return Ok(expr);
        }
        Ok(Expr::Comparison(self.parse_comparison()?))
    }

    fn count_bool_op(&mut self, op: &Token) -> Result<()> {
        if self.bool_ops == MAX_EXPR_DEPTH {
            return Err(too_deep("boolean operators", MAX_EXPR_DEPTH, op));
        }
        self.bool_ops += 1;
        Ok(())
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        let column = self.expect(&[TokenKind::Identifier])?.text.clone();
        let op_tok = self.expect(&[
            TokenKind::Eq,
            TokenKind::NotEq,
            TokenKind::Lt,
            TokenKind::LtEq,
            TokenKind::Gt,
            TokenKind::GtEq,
        ])?;
        let op = match op_tok.kind {
            TokenKind::Eq => ComparisonOp::Eq,
            TokenKind::NotEq => ComparisonOp::NotEq,
            TokenKind::Lt => ComparisonOp::Lt,
            TokenKind::LtEq => ComparisonOp::LtEq,
            TokenKind::Gt => ComparisonOp::Gt,
            _ => ComparisonOp::GtEq,
        };
        let value_tok = self.expect(&[TokenKind::Number, TokenKind::String])?;
        let value = match value_tok.kind {
            TokenKind::Number => number_literal(value_tok)?,
            _ => LiteralValue::String(value_tok.text.clone()),
        };
        Ok(Comparison::new(column, op, value))
    }
}

fn too_deep(what: &'static str, limit: usize, tok: &Token) -> QueryError {
    QueryError::ExpressionTooDeep {
        what,
        limit,
        line: tok.line,
        column: tok.column,
    }
}

/// Integer if the token has no decimal point, else Real. Integers too large
/// for `i64` fall back to Real; values beyond `f64` range are rejected.
fn number_literal(tok: &Token) -> Result<LiteralValue> {
    if !tok.text.contains('.') {
        if let Ok(i) = tok.text.parse::<i64>() {
            return Ok(LiteralValue::Integer(i));
        }
    }
    let invalid = |reason: String| QueryError::InvalidLiteral {
        text: tok.text.clone(),
        line: tok.line,
        column: tok.column,
        reason,
    };
    match tok.text.parse::<f64>() {
        Ok(r) if r.is_finite() => Ok(LiteralValue::Real(r)),
        Ok(_) => Err(invalid("number out of range".into())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Query {
        Parser::parse(text).unwrap()
    }

    fn cmp(col: &str, op: ComparisonOp, v: LiteralValue) -> Expr {
        Comparison::new(col, op, v).into()
    }

    fn int(i: i64) -> LiteralValue {
        LiteralValue::Integer(i)
    }

    #[test]
    fn parse_minimal_query() {
        let q = parse("FROM \"students.csv\" SELECT name");
        assert_eq!(q.from.filename, "students.csv");
        assert_eq!(q.select.columns, vec!["name"]);
        assert!(q.where_clause.is_none());
        assert!(q.order_by.is_none());
        assert!(q.limit.is_none());
    }

    #[test]
    fn parse_full_query() {
        let q = parse(
            "FROM \"students.csv\"\nSELECT name, score\nWHERE score >= 80 AND city = \"Bandung\"\nORDER BY score DESC\nLIMIT 10",
        );
        assert_eq!(q.select.columns, vec!["name", "score"]);
        assert_eq!(
            q.where_clause,
            Some(Expr::and(
                cmp("score", ComparisonOp::GtEq, int(80)),
                cmp("city", ComparisonOp::Eq, LiteralValue::String("Bandung".into())),
            ))
        );
        assert_eq!(
            q.order_by,
            Some(OrderByClause { column: "score".into(), ascending: false })
        );
        assert_eq!(q.limit, Some(LimitClause { count: 10 }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE a=1 OR b=2 AND c=3");
        assert_eq!(
            q.where_clause,
            Some(Expr::or(
                cmp("a", ComparisonOp::Eq, int(1)),
                Expr::and(
                    cmp("b", ComparisonOp::Eq, int(2)),
                    cmp("c", ComparisonOp::Eq, int(3)),
                ),
            ))
        );
    }

    #[test]
    fn parentheses_override_grouping() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE (a=1 OR b=2) AND c=3");
        assert_eq!(
            q.where_clause,
            Some(Expr::and(
                Expr::or(
                    cmp("a", ComparisonOp::Eq, int(1)),
                    cmp("b", ComparisonOp::Eq, int(2)),
                ),
                cmp("c", ComparisonOp::Eq, int(3)),
            ))
        );
    }

    #[test]
    fn connectives_are_left_associative() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE a=1 OR b=2 OR c=3");
        assert_eq!(
            q.where_clause,
            Some(Expr::or(
                Expr::or(
                    cmp("a", ComparisonOp::Eq, int(1)),
                    cmp("b", ComparisonOp::Eq, int(2)),
                ),
                cmp("c", ComparisonOp::Eq, int(3)),
            ))
        );
    }

    #[test]
    fn nested_parentheses() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE ((a < 1))");
        assert_eq!(q.where_clause, Some(cmp("a", ComparisonOp::Lt, int(1))));
    }

    #[test]
    fn all_comparison_operators() {
        let ops = [
            ("=", ComparisonOp::Eq),
            ("!=", ComparisonOp::NotEq),
            ("<", ComparisonOp::Lt),
            ("<=", ComparisonOp::LtEq),
            (">", ComparisonOp::Gt),
            (">=", ComparisonOp::GtEq),
        ];
        for (symbol, op) in ops {
            let q = parse(&format!("FROM \"x.csv\" SELECT a WHERE a {} 5", symbol));
            assert_eq!(q.where_clause, Some(cmp("a", op, int(5))), "operator {}", symbol);
        }
    }

    #[test]
    fn numeric_literals_pick_integer_or_real() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE a > 2.5 OR a < 7");
        assert_eq!(
            q.where_clause,
            Some(Expr::or(
                cmp("a", ComparisonOp::Gt, LiteralValue::Real(2.5)),
                cmp("a", ComparisonOp::Lt, int(7)),
            ))
        );
    }

    #[test]
    fn oversized_integer_literal_becomes_real() {
        let q = parse("FROM \"x.csv\" SELECT a WHERE a < 99999999999999999999");
        assert_eq!(
            q.where_clause,
            Some(cmp("a", ComparisonOp::Lt, LiteralValue::Real(1e20)))
        );
    }

    #[test]
    fn order_by_defaults_to_ascending() {
        let q = parse("FROM \"x.csv\" SELECT a ORDER BY a");
        assert_eq!(q.order_by, Some(OrderByClause { column: "a".into(), ascending: true }));
        let q = parse("FROM \"x.csv\" SELECT a order by a asc");
        assert_eq!(q.order_by, Some(OrderByClause { column: "a".into(), ascending: true }));
    }

    #[test]
    fn fractional_limit_is_floored() {
        let q = parse("FROM \"x.csv\" SELECT a LIMIT 3.9");
        assert_eq!(q.limit, Some(LimitClause { count: 3 }));
    }

    #[test]
    fn limit_out_of_range_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a LIMIT 99999999999999999999999").unwrap_err();
        assert!(matches!(err, QueryError::InvalidLiteral { line: 1, column: 29, .. }));
    }

    #[test]
    fn limit_requires_number() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a LIMIT ten").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected NUMBER at line 1, column 29, got IDENT (\"ten\")"
        );
    }

    #[test]
    fn trailing_token_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a EXTRA").unwrap_err();
        match err {
            QueryError::TrailingToken { found, line, column } => {
                assert_eq!(found, "IDENT (\"EXTRA\")");
                assert_eq!((line, column), (1, 23));
            }
            other => panic!("expected TrailingToken, got {other:?}"),
        }
    }

    #[test]
    fn clauses_out_of_order_are_rejected() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a LIMIT 1 WHERE a = 1").unwrap_err();
        assert!(matches!(err, QueryError::TrailingToken { column: 31, .. }));
    }

    #[test]
    fn from_requires_string() {
        let err = Parser::parse("FROM students SELECT a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected STRING at line 1, column 6, got IDENT (\"students\")"
        );
    }

    #[test]
    fn select_must_come_after_from() {
        let err = Parser::parse("SELECT a FROM \"x.csv\"").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedToken { line: 1, column: 1, .. }));
    }

    #[test]
    fn empty_select_list_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT").unwrap_err();
        assert_eq!(err.to_string(), "expected IDENT but reached end of input");
    }

    #[test]
    fn dangling_comma_in_select_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a, WHERE a = 1").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedToken { column: 24, .. }));
    }

    #[test]
    fn order_without_by_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a ORDER a").unwrap_err();
        assert!(err.to_string().starts_with("expected BY at line 1, column 29"));
    }

    #[test]
    fn unclosed_paren_is_error() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a WHERE (a = 1").unwrap_err();
        assert_eq!(err.to_string(), "expected ')' but reached end of input");
    }

    #[test]
    fn comparison_requires_literal_on_right() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a WHERE a = b").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected NUMBER or STRING at line 1, column 33, got IDENT (\"b\")"
        );
    }

    #[test]
    fn comparison_requires_operator() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a WHERE a 1").unwrap_err();
        assert!(err
            .to_string()
            .starts_with("expected '=' or '!=' or '<' or '<=' or '>' or '>='"));
    }

    #[test]
    fn lexical_errors_surface_through_parse() {
        let err = Parser::parse("FROM \"x.csv\" SELECT a WHERE a = 1 ;").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedCharacter { ch: ';', .. }));
    }

    #[test]
    fn empty_input_is_error() {
        let err = Parser::parse("   ").unwrap_err();
        assert_eq!(err.to_string(), "expected FROM but reached end of input");
    }

    #[test]
    fn canonical_form_reparses_identically() {
        let q = parse("from \"x.csv\" select a, b where a=1 or (b>2.5 and c!=\"z\") order by b limit 4");
        let reparsed = parse(&q.to_string());
        assert_eq!(q, reparsed);
    }

    fn where_clause(predicate: &str) -> String {
        format!("FROM \"x\" SELECT a WHERE {predicate}")
    }

    fn chain(terms: usize, op: &str) -> String {
        vec!["a = 1"; terms].join(&format!(" {op} "))
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let n = MAX_PARSER_DEPTH;
        let text = where_clause(&format!("{}a = 1{}", "(".repeat(n), ")".repeat(n)));
        let q = parse(&text);
        assert_eq!(q.where_clause, Some(cmp("a", ComparisonOp::Eq, int(1))));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let text = where_clause(&format!("{}a = 1{}", "(".repeat(10_000), ")".repeat(10_000)));
        let err = Parser::parse(&text).unwrap_err();
        // `FROM "x" SELECT a WHERE ` is 24 characters; the first '(' is at 25.
        match err {
            QueryError::ExpressionTooDeep { limit, line, column, .. } => {
                assert_eq!(limit, MAX_PARSER_DEPTH);
                assert_eq!((line, column), (1, 25 + MAX_PARSER_DEPTH));
            }
            other => panic!("expected ExpressionTooDeep, got {other:?}"),
        }
    }

    #[test]
    fn long_chains_up_to_the_limit_parse() {
        let q = parse(&where_clause(&chain(MAX_EXPR_DEPTH + 1, "OR")));
        assert_eq!(q.where_clause.map(|e| e.columns().len()), Some(MAX_EXPR_DEPTH + 1));
    }

    #[test]
    fn overlong_chains_are_a_syntax_error() {
        for op in ["OR", "AND"] {
            let err = Parser::parse(&where_clause(&chain(50_000, op))).unwrap_err();
            assert!(
                matches!(err, QueryError::ExpressionTooDeep { limit: MAX_EXPR_DEPTH, .. }),
                "{op}: {err:?}"
            );
        }
    }

    #[test]
    fn operators_inside_groups_count_toward_the_chain_limit() {
        let group = format!("({})", chain(101, "AND"));
        let text = where_clause(&vec![group.as_str(); 10].join(" OR "));
        // 10 groups of 100 ANDs plus 9 ORs exceed the limit.
        assert!(matches!(
            Parser::parse(&text),
            Err(QueryError::ExpressionTooDeep { .. })
        ));
    }

    #[test]
    fn literal_beyond_f64_range_is_rejected() {
        let huge = "9".repeat(400);
        for literal in [huge.clone(), format!("{huge}.5")] {
            let err = Parser::parse(&where_clause(&format!("a > {literal}"))).unwrap_err();
            match err {
                QueryError::InvalidLiteral { line, column, reason, .. } => {
                    assert_eq!((line, column), (1, 29));
                    assert_eq!(reason, "number out of range");
                }
                other => panic!("expected InvalidLiteral, got {other:?}"),
            }
        }
    }

    #[test]
    fn large_but_finite_literal_round_trips() {
        let q = parse(&where_clause(&format!("a > {}", "9".repeat(30))));
        assert_eq!(parse(&q.to_string()), q);
    }
}
