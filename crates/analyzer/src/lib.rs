//! Semantic analysis for parsed `.apy` grammars.
//!
//! Runs the ordered checker passes (duplicates, start-rule resolution,
//! reference resolution, pattern validation, left-recursion marking,
//! advisory lints), computes the panic-mode synchronization sets, and
//! flattens the checked model into the read-only [`CompiledGrammar`] arena
//! shared by the parse runtime and the code emitter.

pub mod check;
pub mod compile;
pub mod diagnostics;
pub mod recovery;
pub mod suggest;

#[cfg(test)]
mod tests;

pub use check::{analyze, Analysis};
pub use compile::{
    CompiledAlt, CompiledGrammar, CompiledRule, CompiledTerm, Matcher, RuleId, TokenId, TokenSpec,
};
pub use diagnostics::{Diagnostic, Severity};

/// Builtin functions callable from actions and guards.
pub use parser::fragment::BUILTINS as BUILTIN_FUNCS;
