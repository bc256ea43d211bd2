//! Match elements of a rule alternative.

use crate::{literal_text, quote_literal, FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

/// Repetition annotation on a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// `?` — match or yield null.
    Optional,
    /// `*` — zero or more, greedy.
    Star,
    /// `+` — one or more, greedy.
    Plus,
}

impl Quantifier {
    fn symbol(self) -> &'static str {
        match self {
            Self::Optional => "?",
            Self::Star => "*",
            Self::Plus => "+",
        }
    }
}

/// What a term matches: a named rule/token, or an inline literal that the
/// checker promotes to a synthetic token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermObject {
    Reference(String),
    Literal(String),
}

/// One atomic match element: `binding:object quantifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    binding: Option<String>,
    object: TermObject,
    quantifier: Option<Quantifier>,
}

impl Term {
    #[must_use]
    pub fn new(
        binding: Option<String>,
        object: TermObject,
        quantifier: Option<Quantifier>,
    ) -> Self {
        Self {
            binding,
            object,
            quantifier,
        }
    }

    #[must_use]
    #[inline]
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    #[must_use]
    #[inline]
    pub fn object(&self) -> &TermObject {
        &self.object
    }

    #[must_use]
    #[inline]
    pub fn quantifier(&self) -> Option<Quantifier> {
        self.quantifier
    }

    /// Name of the referenced rule or token, if this is a reference term.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        match &self.object {
            TermObject::Reference(name) => Some(name),
            TermObject::Literal(_) => None,
        }
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self.object, TermObject::Literal(_))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(binding) = &self.binding {
            write!(f, "{binding}:")?;
        }
        match &self.object {
            TermObject::Reference(name) => write!(f, "{name}")?,
            TermObject::Literal(text) => write!(f, "{}", quote_literal(text, '\''))?,
        }
        if let Some(q) = self.quantifier {
            write!(f, "{}", q.symbol())?;
        }
        Ok(())
    }
}

impl FromPair for Term {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::term);
        let mut binding = None;
        let mut object = None;
        let mut quantifier = None;

        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::binding => {
                    let name = part.into_inner().next().expect("binding without name");
                    binding = Some(name.as_str().to_string());
                }
                Rule::term_obj => {
                    let inner = part.into_inner().next().expect("empty term object");
                    object = Some(match inner.as_rule() {
                        Rule::literal => TermObject::Literal(literal_text(inner)),
                        Rule::ident => TermObject::Reference(inner.as_str().to_string()),
                        other => unreachable!("unexpected term object: {other:?}"),
                    });
                }
                Rule::quantifier => {
                    quantifier = Some(match part.as_str() {
                        "?" => Quantifier::Optional,
                        "*" => Quantifier::Star,
                        "+" => Quantifier::Plus,
                        other => unreachable!("unknown quantifier {other}"),
                    });
                }
                other => unreachable!("unexpected term part: {other:?}"),
            }
        }

        Self {
            binding,
            object: object.expect("term without object"),
            quantifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let plain = Term::new(None, TermObject::Reference("NUMBER".into()), None);
        assert_eq!(plain.to_string(), "NUMBER");

        let bound = Term::new(
            Some("l".into()),
            TermObject::Reference("Expr".into()),
            Some(Quantifier::Star),
        );
        assert_eq!(bound.to_string(), "l:Expr*");

        let lit = Term::new(None, TermObject::Literal("if".into()), None);
        assert_eq!(lit.to_string(), "'if'");
    }

    #[test]
    fn accessors() {
        let t = Term::new(
            Some("n".into()),
            TermObject::Reference("NUMBER".into()),
            Some(Quantifier::Optional),
        );
        assert_eq!(t.binding(), Some("n"));
        assert_eq!(t.reference(), Some("NUMBER"));
        assert!(!t.is_literal());
        assert_eq!(t.quantifier(), Some(Quantifier::Optional));
    }
}
