use crate::{Grammar, Rule};
use pest::error::{Error as PestError, LineColLocation};
use thiserror::Error;

/// A syntactic diagnostic with a 1-based source position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Convert a pest error, shifting its line by `line_offset` so that
    /// errors from isolated segment parses point into the original file.
    pub fn from_pest(err: &PestError<Rule>, line_offset: usize) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos((l, c)) => (l, c),
            LineColLocation::Span((l, c), _) => (l, c),
        };
        Self {
            line: line + line_offset,
            column,
            message: err.variant.message().into_owned(),
        }
    }
}

/// Outcome of parsing one `.apy` source: every grammar that could be built,
/// plus every syntax error encountered along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceParse {
    grammars: Vec<Grammar>,
    errors: Vec<SyntaxError>,
}

impl SourceParse {
    pub(crate) fn new(grammars: Vec<Grammar>, errors: Vec<SyntaxError>) -> Self {
        Self { grammars, errors }
    }

    #[must_use]
    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    #[must_use]
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// True when the source parsed without a single syntax error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Grammar>, Vec<SyntaxError>) {
        (self.grammars, self.errors)
    }
}
