//! Actions: what an alternative yields when its terms match.

use crate::fragment::BUILTINS;
use crate::{Expr, FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Forward the single binding (or single non-literal term value).
    Pass,
    /// Build an AST node `name(args…)`.
    Construct { name: String, args: Vec<Expr> },
    /// Evaluate a bare fragment expression and return its value, as in
    /// `-> x` or `-> int(n)`.
    Value(Expr),
}

impl Action {
    /// Constructor name, if this action builds a node.
    #[must_use]
    pub fn constructor(&self) -> Option<&str> {
        match self {
            Self::Construct { name, .. } => Some(name),
            Self::Pass | Self::Value(_) => None,
        }
    }

    /// Every fragment expression this action evaluates.
    #[must_use]
    pub fn expressions(&self) -> &[Expr] {
        match self {
            Self::Pass => &[],
            Self::Construct { args, .. } => args,
            Self::Value(expr) => std::slice::from_ref(expr),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Construct { name, args } => {
                let args = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{name}({args})")
            }
            Self::Value(expr) => write!(f, "{expr}"),
        }
    }
}

impl FromPair for Action {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::action);
        let inner = pair.into_inner().next().expect("empty action");
        match inner.as_rule() {
            Rule::kw_pass => Self::Pass,
            Rule::constructor => {
                let mut parts = inner.into_inner();
                let name = parts
                    .next()
                    .expect("constructor without name")
                    .as_str()
                    .to_string();
                let args: Vec<Expr> = match parts.next() {
                    Some(list) => list.into_inner().map(Expr::from_pair).collect(),
                    None => Vec::new(),
                };
                // A "constructor" named after a builtin is really a call,
                // as in `-> int(n)`.
                if BUILTINS.contains(&name.as_str()) && args.len() == 1 {
                    let arg = args.into_iter().next().expect("checked length");
                    Self::Value(Expr::Call {
                        func: name,
                        arg: Box::new(arg),
                    })
                } else {
                    Self::Construct { name, args }
                }
            }
            Rule::expr => Self::Value(Expr::from_pair(inner)),
            other => unreachable!("unexpected action content: {other:?}"),
        }
    }
}
