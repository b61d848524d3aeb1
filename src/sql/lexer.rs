//! Hand-written tokenizer for the csvql query language.
//!
//! The [`Lexer`] takes raw query text and produces a `Vec<Token>`. Every
//! token carries its original text and the 1-based line/column where it
//! starts. Keywords are matched case-insensitively; whitespace and newlines
//! are consumed without producing tokens.

use std::fmt;
use std::ops::Range;

use tracing::debug;

use crate::error::{QueryError, Result};

/// The classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // -----------------------------------------------------------------------
    // Keywords
    // -----------------------------------------------------------------------
    From,
    Select,
    Where,
    Order,
    By,
    Limit,
    And,
    Or,
    Asc,
    Desc,

    // -----------------------------------------------------------------------
    // Literals & identifiers
    // -----------------------------------------------------------------------
    Number,
    String,
    Identifier,

    // -----------------------------------------------------------------------
    // Operators & punctuation
    // -----------------------------------------------------------------------
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Comma,
    LeftParen,
    RightParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::From => "FROM",
            TokenKind::Select => "SELECT",
            TokenKind::Where => "WHERE",
            TokenKind::Order => "ORDER",
            TokenKind::By => "BY",
            TokenKind::Limit => "LIMIT",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Asc => "ASC",
            TokenKind::Desc => "DESC",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Identifier => "IDENT",
            TokenKind::Eq => "'='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::LtEq => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::GtEq => "'>='",
            TokenKind::Comma => "','",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
        };
        f.write_str(name)
    }
}

/// A single classified lexical unit.
///
/// `text` is the source text of the token, except for string literals where
/// it is the content between the quotes (escape sequences are kept raw).
/// `span` is the byte range of the full token in the input, quotes included.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub span: Range<usize>,
}

impl fmt::Display for Token {
    /// Renders as `KIND ("text")`, the form used in syntax errors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.kind, self.text)
    }
}

// ---------------------------------------------------------------------------
// Keyword lookup
// ---------------------------------------------------------------------------

fn keyword_kind(word: &str) -> Option<TokenKind> {
    // The input `word` is already uppercased by the caller.
    match word {
        "FROM" => Some(TokenKind::From),
        "SELECT" => Some(TokenKind::Select),
        "WHERE" => Some(TokenKind::Where),
        "ORDER" => Some(TokenKind::Order),
        "BY" => Some(TokenKind::By),
        "LIMIT" => Some(TokenKind::Limit),
        "AND" => Some(TokenKind::And),
        "OR" => Some(TokenKind::Or),
        "ASC" => Some(TokenKind::Asc),
        "DESC" => Some(TokenKind::Desc),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// A hand-written tokenizer.
///
/// Create one with [`Lexer::new`], then call [`Lexer::tokenize`] to obtain
/// the full token stream.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    /// Byte offset up to which columns on the current line are counted.
    column_pos: usize,
    /// Characters between the start of the current line and `column_pos`.
    column_chars: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            line: 1,
            column_pos: 0,
            column_chars: 0,
        }
    }

    /// Tokenize the entire input.
    ///
    /// Stops at the first character that cannot start a token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        debug!(tokens = tokens.len(), lines = self.line, "tokenized query");
        Ok(tokens)
    }

    // -- helpers ------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    /// 1-based column of the byte offset `at` on the current line, counted
    /// in characters. `at` never moves backwards within a line, so each
    /// character is counted once.
    fn column_of(&mut self, at: usize) -> usize {
        self.column_chars += self.input[self.column_pos..at].chars().count();
        self.column_pos = at;
        self.column_chars + 1
    }

    fn newline(&mut self) {
        self.line += 1;
        self.column_pos = self.pos;
        self.column_chars = 0;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.newline();
                }
                _ => break,
            }
        }
    }

    fn make_token(&self, kind: TokenKind, text: String, start: usize, line: usize, column: usize) -> Token {
        Token {
            kind,
            text,
            line,
            column,
            span: start..self.pos,
        }
    }

    // -- main scanner -------------------------------------------------------

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let ch = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        let start = self.pos;
        let line = self.line;
        let column = self.column_of(start);

        let token = if ch.is_ascii_digit() {
            self.read_number(start, line, column)
        } else if ch == b'"' {
            self.read_string_literal(start, line, column)?
        } else if ch.is_ascii_alphabetic() || ch == b'_' {
            self.read_identifier_or_keyword(start, line, column)
        } else {
            self.read_operator(start, line, column)?
        };
        Ok(Some(token))
    }

    // -- literal readers ----------------------------------------------------

    /// Digits with at most one fractional part; no sign, no exponent.
    fn read_number(&mut self, start: usize, line: usize, column: usize) -> Token {
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text = self.input[start..self.pos].to_string();
        self.make_token(TokenKind::Number, text, start, line, column)
    }

    /// A double-quoted string. A backslash escapes the next character, which
    /// is kept verbatim in the token text.
    fn read_string_literal(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        self.pos += 1; // consume opening "
        let content_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(QueryError::UnterminatedString { line, column }),
                Some(b'"') => break,
                Some(b'\\') => {
                    self.pos += 1;
                    match self.peek() {
                        None => return Err(QueryError::UnterminatedString { line, column }),
                        Some(b'\n') => {
                            self.pos += 1;
                            self.newline();
                        }
                        Some(_) => self.advance_char(),
                    }
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.newline();
                }
                Some(_) => self.advance_char(),
            }
        }
        let content = self.input[content_start..self.pos].to_string();
        self.pos += 1; // consume closing "
        Ok(self.make_token(TokenKind::String, content, start, line, column))
    }

    /// Step over one full UTF-8 character.
    fn advance_char(&mut self) {
        let width = self.input[self.pos..].chars().next().map_or(1, char::len_utf8);
        self.pos += width;
    }

    fn read_identifier_or_keyword(&mut self, start: usize, line: usize, column: usize) -> Token {
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];
        let kind = keyword_kind(&word.to_ascii_uppercase()).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, word.to_string(), start, line, column)
    }

    fn read_operator(&mut self, start: usize, line: usize, column: usize) -> Result<Token> {
        // Two-character operators are tried before their one-character prefixes.
        let two = match (self.peek(), self.peek_at(1)) {
            (Some(b'>'), Some(b'=')) => Some(TokenKind::GtEq),
            (Some(b'<'), Some(b'=')) => Some(TokenKind::LtEq),
            (Some(b'!'), Some(b'=')) => Some(TokenKind::NotEq),
            _ => None,
        };
        let kind = match two {
            Some(kind) => {
                self.pos += 2;
                kind
            }
            None => {
                let kind = match self.peek() {
                    Some(b'>') => TokenKind::Gt,
                    Some(b'<') => TokenKind::Lt,
                    Some(b'=') => TokenKind::Eq,
                    Some(b',') => TokenKind::Comma,
                    Some(b'(') => TokenKind::LeftParen,
                    Some(b')') => TokenKind::RightParen,
                    _ => {
                        let ch = self.input[start..].chars().next().unwrap_or('\0');
                        return Err(QueryError::UnexpectedCharacter { ch, line, column });
                    }
                };
                self.pos += 1;
                kind
            }
        };
        let text = self.input[start..self.pos].to_string();
        Ok(self.make_token(kind, text, start, line, column))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
