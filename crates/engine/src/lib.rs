//! The PEG parse runtime.
//!
//! Interprets a [`analyzer::CompiledGrammar`] over an input string: a
//! first-match-wins regex lexer, a packrat parser with ordered choice,
//! greedy repetition, seed-growing for direct left recursion, semantic
//! actions and guards, and panic-mode error recovery. The same semantics
//! are what the code emitter bakes into generated parsers.

pub mod eval;
pub mod lexer;
pub mod packrat;
pub mod result;
pub mod value;

#[cfg(test)]
mod tests;

pub use result::{ParseError, ParseResult};
pub use value::{ErrorNode, Token, Value};

use analyzer::{CompiledGrammar, RuleId};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Name of the synthetic token produced for unlexable input.
pub const ERROR_TOKEN: &str = "ERROR";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pattern for token '{name}' failed to compile: {source}")]
    BadTokenPattern {
        name: String,
        #[source]
        source: Box<regex::Error>,
    },
    #[error("unknown rule '{0}'")]
    UnknownRule(String),
}

/// Per-engine knobs. Each parse invocation owns all of its mutable state;
/// an engine is freely shared across parses.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Panic-mode recovery: keep parsing past errors, producing error nodes.
    pub recovery: bool,
    /// Stop at the first unlexable character instead of emitting an error
    /// token and continuing.
    pub halt_on_lex_error: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            recovery: true,
            halt_on_lex_error: false,
        }
    }
}

/// A ready-to-parse grammar: the compiled image plus its token automata.
pub struct Engine<'g> {
    grammar: &'g CompiledGrammar,
    regexes: Vec<Regex>,
    options: EngineOptions,
}

impl<'g> Engine<'g> {
    pub fn new(grammar: &'g CompiledGrammar) -> Result<Self, EngineError> {
        Self::with_options(grammar, EngineOptions::default())
    }

    pub fn with_options(
        grammar: &'g CompiledGrammar,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let regexes = grammar
            .tokens()
            .iter()
            .map(|spec| {
                Regex::new(&format!(r"\A(?:{})", spec.pattern())).map_err(|err| {
                    EngineError::BadTokenPattern {
                        name: spec.name().to_string(),
                        source: Box::new(err),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            grammar,
            regexes,
            options,
        })
    }

    #[must_use]
    #[inline]
    pub fn grammar(&self) -> &CompiledGrammar {
        self.grammar
    }

    #[must_use]
    #[inline]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Parse from the grammar's start rule.
    #[must_use]
    pub fn parse(&self, input: &str) -> ParseResult {
        self.run(self.grammar.start(), input)
    }

    /// Parse from an arbitrary rule, as test suites do.
    pub fn parse_rule(&self, rule_name: &str, input: &str) -> Result<ParseResult, EngineError> {
        let id = self
            .grammar
            .rule_id(rule_name)
            .ok_or_else(|| EngineError::UnknownRule(rule_name.to_string()))?;
        Ok(self.run(id, input))
    }

    fn run(&self, entry: RuleId, input: &str) -> ParseResult {
        let lexed = lexer::lex(self, input);
        debug!(
            grammar = self.grammar.name(),
            tokens = lexed.tokens.len(),
            errors = lexed.errors.len(),
            "lexed input"
        );
        if self.options.halt_on_lex_error && !lexed.errors.is_empty() {
            return ParseResult::new(Value::Null, lexed.errors, lexed.tokens);
        }
        packrat::run(self, entry, lexed)
    }
}
