//! Check guards: post-match condition and effect attached to an alternative.

use crate::{literal_text, quote_literal, Expr, FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

/// A statement in a guard branch.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardStmt {
    /// Keep the action value.
    Pass,
    /// Fail the alternative with a user-supplied message.
    Error(String),
    /// Bind `name` in the alternative scope; assigning to `res` replaces the
    /// alternative's value.
    Assign { name: String, value: Expr },
    /// Evaluate for effect, discard the value.
    Eval(Expr),
}

impl fmt::Display for GuardStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Error(msg) => write!(f, "error({})", quote_literal(msg, '\'')),
            Self::Assign { name, value } => write!(f, "{name} = {value}"),
            Self::Eval(expr) => write!(f, "{expr}"),
        }
    }
}

impl FromPair for GuardStmt {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::guard_stmt);
        let inner = pair.into_inner().next().expect("empty guard statement");
        match inner.as_rule() {
            Rule::kw_pass => Self::Pass,
            Rule::error_call => {
                let msg = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::literal)
                    .expect("error() without message");
                Self::Error(literal_text(msg))
            }
            Rule::assign => {
                let mut parts = inner.into_inner();
                let name = parts
                    .next()
                    .expect("assignment without target")
                    .as_str()
                    .to_string();
                let value = Expr::from_pair(parts.next().expect("assignment without value"));
                Self::Assign { name, value }
            }
            Rule::expr => Self::Eval(Expr::from_pair(inner)),
            other => unreachable!("unexpected guard statement: {other:?}"),
        }
    }
}

/// `check COND then STMT [else then STMT]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    condition: Expr,
    then_branch: GuardStmt,
    else_branch: Option<GuardStmt>,
}

impl Guard {
    #[must_use]
    pub fn new(condition: Expr, then_branch: GuardStmt, else_branch: Option<GuardStmt>) -> Self {
        Self {
            condition,
            then_branch,
            else_branch,
        }
    }

    #[must_use]
    #[inline]
    pub fn condition(&self) -> &Expr {
        &self.condition
    }

    #[must_use]
    #[inline]
    pub fn then_branch(&self) -> &GuardStmt {
        &self.then_branch
    }

    #[must_use]
    #[inline]
    pub fn else_branch(&self) -> Option<&GuardStmt> {
        self.else_branch.as_ref()
    }

    /// Every expression appearing in the guard, for validation walks.
    pub fn expressions(&self) -> Vec<&Expr> {
        let mut out = vec![&self.condition];
        for stmt in [Some(&self.then_branch), self.else_branch.as_ref()]
            .into_iter()
            .flatten()
        {
            match stmt {
                GuardStmt::Assign { value, .. } => out.push(value),
                GuardStmt::Eval(expr) => out.push(expr),
                GuardStmt::Pass | GuardStmt::Error(_) => {}
            }
        }
        out
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "check {} then {}", self.condition, self.then_branch)?;
        if let Some(else_branch) = &self.else_branch {
            write!(f, " else then {else_branch}")?;
        }
        Ok(())
    }
}

impl FromPair for Guard {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::guard);
        let mut condition = None;
        let mut then_branch = None;
        let mut else_branch = None;
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::expr => condition = Some(Expr::from_pair(part)),
                Rule::guard_stmt => then_branch = Some(GuardStmt::from_pair(part)),
                Rule::else_clause => {
                    let stmt = part
                        .into_inner()
                        .find(|p| p.as_rule() == Rule::guard_stmt)
                        .expect("else clause without statement");
                    else_branch = Some(GuardStmt::from_pair(stmt));
                }
                _ => {}
            }
        }
        Self {
            condition: condition.expect("guard without condition"),
            then_branch: then_branch.expect("guard without then branch"),
            else_branch,
        }
    }
}
