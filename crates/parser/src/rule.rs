//! Parsing rules and their ordered alternatives.

use crate::{Action, FromPair, Guard, Rule, Term};
use pest::iterators::Pair;
use std::fmt;

/// One alternative of a rule: a term sequence, an action, and an optional
/// check guard. Alternatives are tried in declaration order; the first whose
/// terms match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    terms: Vec<Term>,
    action: Action,
    guard: Option<Guard>,
}

impl Alternative {
    #[must_use]
    pub fn new(terms: Vec<Term>, action: Action, guard: Option<Guard>) -> Self {
        Self {
            terms,
            action,
            guard,
        }
    }

    #[must_use]
    #[inline]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    #[must_use]
    #[inline]
    pub fn action(&self) -> &Action {
        &self.action
    }

    #[must_use]
    #[inline]
    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    /// Name of the first term's reference, ignoring the binding prefix.
    /// Drives direct-left-recursion marking.
    #[must_use]
    pub fn leading_reference(&self) -> Option<&str> {
        self.terms.first().and_then(Term::reference)
    }

    /// Bindings introduced by this alternative, in term order.
    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(Term::binding)
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self
            .terms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "| {terms} -> {}", self.action)?;
        if let Some(guard) = &self.guard {
            write!(f, " {guard}")?;
        }
        Ok(())
    }
}

impl FromPair for Alternative {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::alternative);
        let mut terms = Vec::new();
        let mut action = None;
        let mut guard = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::term => terms.push(Term::from_pair(part)),
                Rule::action => action = Some(Action::from_pair(part)),
                Rule::guard => guard = Some(Guard::from_pair(part)),
                other => unreachable!("unexpected alternative part: {other:?}"),
            }
        }
        Self {
            terms,
            action: action.expect("alternative without action"),
            guard,
        }
    }
}

/// A named parsing procedure with ordered alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarRule {
    name: String,
    is_start: bool,
    alternatives: Vec<Alternative>,
    line: usize,
}

impl GrammarRule {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        is_start: bool,
        alternatives: Vec<Alternative>,
        line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            is_start,
            alternatives,
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
    pub fn is_start(&self) -> bool {
        self.is_start
    }

    #[must_use]
    #[inline]
    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
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

impl fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_start {
            writeln!(f, "start rule {}:", self.name)?;
        } else {
            writeln!(f, "rule {}:", self.name)?;
        }
        for alt in &self.alternatives {
            writeln!(f, "    {alt}")?;
        }
        write!(f, "end")
    }
}

impl FromPair for GrammarRule {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::rule_block);
        let line = pair.as_span().start_pos().line_col().0;
        let mut is_start = false;
        let mut name = String::new();
        let mut alternatives = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::kw_start => is_start = true,
                Rule::ident => name = part.as_str().to_string(),
                Rule::alternative => alternatives.push(Alternative::from_pair(part)),
                _ => {}
            }
        }
        Self {
            name,
            is_start,
            alternatives,
            line,
        }
    }
}
