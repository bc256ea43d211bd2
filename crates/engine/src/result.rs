//! The parse result object exposed to callers and generated parsers.

use crate::value::{Token, Value};
use thiserror::Error;

/// A positioned parse-time error. Never thrown past the API boundary;
/// parses collect these and finish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Outcome of one parse: the AST (null on total failure), every error
/// collected, and the token stream the parser saw.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub ast: Value,
    pub errors: Vec<ParseError>,
    pub tokens: Vec<Token>,
}

impl ParseResult {
    #[must_use]
    pub fn new(ast: Value, errors: Vec<ParseError>, tokens: Vec<Token>) -> Self {
        Self {
            ast,
            errors,
            tokens,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The AST if the parse was clean, else the first error.
    pub fn unwrap_ast(self) -> Result<Value, ParseError> {
        match self.errors.into_iter().next() {
            None => Ok(self.ast),
            Some(first) => Err(first),
        }
    }
}
