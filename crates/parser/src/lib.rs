//! Front-end for `.apy` grammar files.
//!
//! Parses the parser-definition DSL into structured [`Grammar`] models:
//! token tables, parsing rules with actions and guards, and embedded test
//! suites. Malformed input is reported as [`SyntaxError`]s with source
//! positions; the front-end recovers past a broken block so one run can
//! report several errors.

pub mod action;
pub mod error;
pub mod fragment;
pub mod grammar;
pub mod guard;
pub mod rule;
mod recover;
pub mod suite;
pub mod term;
pub mod token;

#[cfg(test)]
mod tests;

// Re-export core types for convenient access
pub use action::Action;
pub use error::{SourceParse, SyntaxError};
pub use fragment::{Expr, Field};
pub use grammar::{parse_str, Grammar};
pub use guard::{Guard, GuardStmt};
pub use rule::{Alternative, GrammarRule};
pub use suite::{Expectation, Pattern, TestCase, TestSuite};
pub use term::{Quantifier, Term, TermObject};
pub use token::TokenDecl;

use pest::iterators::Pair;
use pest_derive::Parser;

/// The `.apy` front-end is powered by pest, a PEG parser framework.
#[derive(Parser)]
#[grammar = "apy.pest"]
pub struct ApyParser;

/// Trait for converting pest parse trees into grammar model types.
///
/// Implementations may assume the pair has the shape the grammar in
/// `apy.pest` guarantees for their construct.
pub trait FromPair {
    fn from_pair(pair: Pair<Rule>) -> Self;
}

/// Decode a `literal` pair into its text, undoing quote doubling.
pub(crate) fn literal_text(pair: Pair<Rule>) -> String {
    debug_assert_eq!(pair.as_rule(), Rule::literal);
    let quoted = pair
        .into_inner()
        .next()
        .expect("literal without quoted body");
    let double = quoted.as_rule() == Rule::dq_string;
    let inner = quoted
        .into_inner()
        .next()
        .expect("quoted string without inner text");
    if double {
        inner.as_str().replace("\"\"", "\"")
    } else {
        inner.as_str().replace("''", "'")
    }
}

/// Quote `text` for display, doubling embedded quotes.
pub(crate) fn quote_literal(text: &str, quote: char) -> String {
    let doubled = match quote {
        '\'' => text.replace('\'', "''"),
        _ => text.replace('"', "\"\""),
    };
    format!("{quote}{doubled}{quote}")
}
