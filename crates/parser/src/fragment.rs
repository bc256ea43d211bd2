//! Host-fragment expressions embedded in actions and guards.
//!
//! Rather than carrying opaque target-language text, fragments are restricted
//! to a small whitelisted grammar (identifiers, token field access, literals,
//! builtin calls, arithmetic, comparison) so the in-process test runner can
//! evaluate them and the emitter can translate them.

use crate::{literal_text, quote_literal, FromPair, Rule};
use pest::iterators::Pair;
use std::fmt;

/// Builtin functions callable from actions and guards.
pub const BUILTINS: &[&str] = &["float", "int", "len", "str"];

/// Token fields addressable as `binding.field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The matched text (`.value` or `.text`).
    Value,
    Line,
    Column,
}

impl Field {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "value" | "text" => Some(Self::Value),
            "line" => Some(Self::Line),
            "column" => Some(Self::Column),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Line => "line",
            Self::Column => "column",
        }
    }
}

/// Arithmetic operators usable inside fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// Comparison operators usable at the top of a guard condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A whitelisted fragment expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A binding reference.
    Ident(String),
    /// A token field access, e.g. `n.value`.
    FieldAccess { base: String, field: String },
    Int(i64),
    Float(f64),
    Str(String),
    /// A single-argument call; the callee is validated against the builtin
    /// set (`int`, `float`, `str`, `len`) by the semantic checker.
    Call { func: String, arg: Box<Expr> },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Callee names of every call in this expression, for validation.
    pub fn called_funcs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_funcs(&mut out);
        out
    }

    fn collect_funcs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Call { func, arg } => {
                out.push(func);
                arg.collect_funcs(out);
            }
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => {
                lhs.collect_funcs(out);
                rhs.collect_funcs(out);
            }
            _ => {}
        }
    }

    /// `(base, field)` pairs of every field access, for validation.
    pub fn referenced_fields(&self) -> Vec<(&str, &str)> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Self::FieldAccess { base, field } => out.push((base, field)),
            Self::Call { arg, .. } => arg.collect_fields(out),
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => {
                lhs.collect_fields(out);
                rhs.collect_fields(out);
            }
            _ => {}
        }
    }

    /// Binding names this expression reads.
    pub fn referenced_idents(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_idents(&mut out);
        out
    }

    fn collect_idents<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Ident(name) => out.push(name),
            Self::FieldAccess { base, .. } => out.push(base),
            Self::Call { arg, .. } => arg.collect_idents(out),
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => {
                lhs.collect_idents(out);
                rhs.collect_idents(out);
            }
            _ => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::FieldAccess { base, field } => write!(f, "{base}.{field}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                if v.fract() == 0.0 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v}")
                }
            }
            Self::Str(text) => write!(f, "{}", quote_literal(text, '\'')),
            Self::Call { func, arg } => write!(f, "{func}({arg})"),
            Self::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Self::Compare { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
        }
    }
}

impl FromPair for Expr {
    fn from_pair(pair: Pair<Rule>) -> Self {
        match pair.as_rule() {
            Rule::expr => build_comparison(pair),
            Rule::sum => build_sum(pair),
            Rule::product => build_product(pair),
            Rule::atom => build_atom(pair),
            other => unreachable!("not an expression pair: {other:?}"),
        }
    }
}

fn build_comparison(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let lhs = build_sum(inner.next().expect("comparison without operand"));
    match inner.next() {
        None => lhs,
        Some(op) => {
            let op = match op.as_str() {
                "==" => CmpOp::Eq,
                "!=" => CmpOp::Ne,
                "<=" => CmpOp::Le,
                ">=" => CmpOp::Ge,
                "<" => CmpOp::Lt,
                ">" => CmpOp::Gt,
                other => unreachable!("unknown comparison operator {other}"),
            };
            let rhs = build_sum(inner.next().expect("comparison without right operand"));
            Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }
    }
}

fn build_sum(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_product(inner.next().expect("sum without operand"));
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            other => unreachable!("unknown additive operator {other}"),
        };
        let rhs = build_product(inner.next().expect("sum without right operand"));
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
    lhs
}

fn build_product(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let mut lhs = build_atom(inner.next().expect("product without operand"));
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            "%" => BinOp::Rem,
            other => unreachable!("unknown multiplicative operator {other}"),
        };
        let rhs = build_atom(inner.next().expect("product without right operand"));
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
    lhs
}

fn build_atom(pair: Pair<Rule>) -> Expr {
    let inner = pair
        .into_inner()
        .next()
        .expect("atom without content");
    match inner.as_rule() {
        Rule::call => {
            let mut parts = inner.into_inner();
            let func = parts.next().expect("call without callee").as_str().to_string();
            let arg = build_comparison(parts.next().expect("call without argument"));
            Expr::Call {
                func,
                arg: Box::new(arg),
            }
        }
        Rule::float_lit => Expr::Float(inner.as_str().parse().expect("float literal")),
        Rule::int_lit => Expr::Int(inner.as_str().parse().expect("integer literal")),
        Rule::literal => Expr::Str(literal_text(inner)),
        Rule::field_access => {
            let mut parts = inner.into_inner();
            let base = parts.next().expect("field access base").as_str().to_string();
            let field = parts.next().expect("field access name").as_str().to_string();
            Expr::FieldAccess { base, field }
        }
        Rule::ident => Expr::Ident(inner.as_str().to_string()),
        Rule::expr => build_comparison(inner),
        other => unreachable!("unexpected atom content: {other:?}"),
    }
}
