//! Lexer table entries.

use crate::{FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

/// One ordered entry of the lexer table: `NAME: [skip] PATTERN`.
///
/// The pattern is a regular expression in the host dialect, taken literally
/// to end of line. Tokens are tried in declaration order; first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDecl {
    name: String,
    skip: bool,
    pattern: String,
    line: usize,
}

impl TokenDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, skip: bool, pattern: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            skip,
            pattern: pattern.into(),
            line,
        }
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn is_skip(&self) -> bool {
        self.skip
    }

    #[must_use]
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn offset_line(&mut self, by: usize) {
        self.line += by;
    }
}

impl fmt::Display for TokenDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skip {
            write!(f, "{}: skip {}", self.name, self.pattern)
        } else {
            write!(f, "{}: {}", self.name, self.pattern)
        }
    }
}

impl FromPair for TokenDecl {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::token_line);
        let line = pair.as_span().start_pos().line_col().0;
        let mut inner = pair.into_inner();
        let name = inner
            .next()
            .expect("token line without name")
            .as_str()
            .to_string();
        let mut skip = false;
        let mut pattern = String::new();
        for part in inner {
            match part.as_rule() {
                Rule::kw_skip => skip = true,
                Rule::token_pattern => pattern = part.as_str().trim_end().to_string(),
                other => unreachable!("unexpected token line part: {other:?}"),
            }
        }
        Self {
            name,
            skip,
            pattern,
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_skip_flag() {
        let ws = TokenDecl::new("WS", true, r"\s+", 3);
        assert_eq!(ws.to_string(), r"WS: skip \s+");

        let num = TokenDecl::new("NUMBER", false, r"\d+", 2);
        assert_eq!(num.to_string(), r"NUMBER: \d+");
        assert_eq!(num.line(), 2);
    }
}
