//! Query-language front end for csvql.
//!
//! This module contains the lexer (tokenizer), abstract syntax tree (AST)
//! definitions, and a recursive-descent parser that transforms raw query
//! text into a [`Query`] ready for execution.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::{Token, TokenKind};

use crate::error::Result;

/// Convert query text into its token sequence.
pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    lexer::Lexer::new(text).tokenize()
}

/// Tokenize and parse query text into a [`Query`].
pub fn parse(text: &str) -> Result<Query> {
    parser::Parser::parse(text)
}
