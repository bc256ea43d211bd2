//! Embedded test suites: `test Name [Rule]:` blocks.

use crate::{literal_text, quote_literal, FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

/// An expected AST shape inside `Yields(…)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Constructor pattern; `open` means the argument list ended with `...`
    /// and any remaining arguments are ignored.
    Node {
        name: String,
        args: Vec<Pattern>,
        open: bool,
    },
    Int(i64),
    Float(f64),
    /// Matches token text or string values.
    Str(String),
    Bool(bool),
    Null,
    /// `...` in value position: matches anything.
    Wildcard,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { name, args, open } => {
                let mut parts: Vec<String> = args.iter().map(ToString::to_string).collect();
                if *open {
                    parts.push("...".into());
                }
                write!(f, "{name}({})", parts.join(", "))
            }
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                if v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Str(text) => write!(f, "{}", quote_literal(text, '\'')),
            Self::Bool(v) => write!(f, "{}", if *v { "true" } else { "false" }),
            Self::Null => write!(f, "null"),
            Self::Wildcard => write!(f, "..."),
        }
    }
}

impl FromPair for Pattern {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::pattern);
        let inner = pair.into_inner().next().expect("empty pattern");
        match inner.as_rule() {
            Rule::wildcard => Self::Wildcard,
            Rule::pat_bool => Self::Bool(matches!(inner.as_str(), "True" | "true")),
            Rule::pat_null => Self::Null,
            Rule::pat_float => Self::Float(inner.as_str().parse().expect("float pattern")),
            Rule::pat_int => Self::Int(inner.as_str().parse().expect("integer pattern")),
            Rule::pat_str => Self::Str(literal_text(
                inner.into_inner().next().expect("string pattern"),
            )),
            Rule::pat_node => {
                let mut parts = inner.into_inner();
                let name = parts
                    .next()
                    .expect("node pattern without name")
                    .as_str()
                    .to_string();
                let mut args: Vec<Pattern> = parts.map(Pattern::from_pair).collect();
                // Only a trailing `...` opens the argument list; elsewhere it
                // is a positional match-anything.
                let open = matches!(args.last(), Some(Pattern::Wildcard));
                if open {
                    args.pop();
                }
                Self::Node { name, args, open }
            }
            other => unreachable!("unexpected pattern content: {other:?}"),
        }
    }
}

/// What a test case expects of the parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    Success,
    Fail,
    Yields(Pattern),
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Fail => write!(f, "Fail"),
            Self::Yields(pattern) => write!(f, "Yields({pattern})"),
        }
    }
}

/// One `"input" => expectation` line.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    input: String,
    expectation: Expectation,
    line: usize,
}

impl TestCase {
    #[must_use]
    pub fn new(input: impl Into<String>, expectation: Expectation, line: usize) -> Self {
        Self {
            input: input.into(),
            expectation,
            line,
        }
    }

    #[must_use]
    #[inline]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    #[inline]
    pub fn expectation(&self) -> &Expectation {
        &self.expectation
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

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} => {}",
            quote_literal(&self.input, '"'),
            self.expectation
        )
    }
}

impl FromPair for TestCase {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::test_case);
        let line = pair.as_span().start_pos().line_col().0;
        let mut inner = pair.into_inner();
        let input = literal_text(inner.next().expect("test case without input"));
        let expectation_pair = inner
            .next()
            .expect("test case without expectation")
            .into_inner()
            .next()
            .expect("empty expectation");
        let expectation = match expectation_pair.as_rule() {
            Rule::exp_success => Expectation::Success,
            Rule::exp_fail => Expectation::Fail,
            Rule::yields => match expectation_pair.into_inner().next() {
                Some(pattern) => Expectation::Yields(Pattern::from_pair(pattern)),
                // Bare Yields() only makes sense as "anything": treat as a
                // wildcard match.
                None => Expectation::Yields(Pattern::Wildcard),
            },
            other => unreachable!("unexpected expectation: {other:?}"),
        };
        Self {
            input,
            expectation,
            line,
        }
    }
}

/// A named group of test cases, optionally targeting a non-start rule.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSuite {
    name: String,
    target_rule: Option<String>,
    cases: Vec<TestCase>,
}

impl TestSuite {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        target_rule: Option<String>,
        cases: Vec<TestCase>,
    ) -> Self {
        Self {
            name: name.into(),
            target_rule,
            cases,
        }
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn target_rule(&self) -> Option<&str> {
        self.target_rule.as_deref()
    }

    #[must_use]
    #[inline]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub(crate) fn offset_lines(&mut self, by: usize) {
        for case in &mut self.cases {
            case.offset_line(by);
        }
    }
}

impl fmt::Display for TestSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target_rule {
            Some(rule) => writeln!(f, "test {} {rule}:", self.name)?,
            None => writeln!(f, "test {}:", self.name)?,
        }
        for case in &self.cases {
            writeln!(f, "    {case}")?;
        }
        write!(f, "end")
    }
}

impl FromPair for TestSuite {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::test_block);
        let mut name = String::new();
        let mut target_rule = None;
        let mut cases = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident => name = part.as_str().to_string(),
                Rule::target_rule => target_rule = Some(part.as_str().to_string()),
                Rule::test_case => cases.push(TestCase::from_pair(part)),
                _ => {}
            }
        }
        Self {
            name,
            target_rule,
            cases,
        }
    }
}
