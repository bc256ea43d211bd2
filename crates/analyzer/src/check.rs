//! The ordered semantic checker passes.

use crate::compile::{self, CompiledGrammar};
use crate::diagnostics::Diagnostic;
use crate::suggest;
use crate::BUILTIN_FUNCS;
use itertools::Itertools;
use parser::{Action, Expr, Field, Grammar, GrammarRule, GuardStmt, TermObject};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of analyzing one grammar: the diagnostics found, and the compiled
/// image when nothing fatal was found.
#[derive(Debug, Clone)]
pub struct Analysis {
    diagnostics: Vec<Diagnostic>,
    compiled: Option<CompiledGrammar>,
}

impl Analysis {
    #[must_use]
    #[inline]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// The compiled image; `None` when the grammar had fatal errors.
    #[must_use]
    #[inline]
    pub fn compiled(&self) -> Option<&CompiledGrammar> {
        self.compiled.as_ref()
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, Option<CompiledGrammar>) {
        (self.diagnostics, self.compiled)
    }
}

/// Run every checker pass over a grammar and compile it if it is sound.
#[must_use]
pub fn analyze(grammar: &Grammar) -> Analysis {
    let mut diags = Vec::new();

    check_duplicates(grammar, &mut diags);
    check_structure(grammar, &mut diags);
    check_start_rule(grammar, &mut diags);
    check_references(grammar, &mut diags);
    check_token_patterns(grammar, &mut diags);
    check_fragments(grammar, &mut diags);
    advisory_naming(grammar, &mut diags);
    advisory_unused_tokens(grammar, &mut diags);
    advisory_shadowed_tokens(grammar, &mut diags);
    advisory_unreachable_rules(grammar, &mut diags);
    advisory_constructor_arity(grammar, &mut diags);

    // Report in source order regardless of which pass found what.
    let diags = diags
        .into_iter()
        .sorted_by_key(|d| d.line())
        .collect_vec();

    let fatal = diags.iter().any(Diagnostic::is_fatal);
    let compiled = if fatal {
        debug!(
            "grammar '{}' has fatal diagnostics; skipping compilation",
            grammar.name()
        );
        None
    } else {
        Some(compile::compile(grammar))
    };

    Analysis {
        diagnostics: diags,
        compiled,
    }
}

fn check_duplicates(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let mut seen_tokens: HashMap<&str, usize> = HashMap::new();
    for token in grammar.tokens() {
        if let Some(first) = seen_tokens.get(token.name()) {
            diags.push(Diagnostic::error(
                token.line(),
                format!(
                    "duplicate token '{}' (first defined at line {first})",
                    token.name()
                ),
            ));
        } else {
            seen_tokens.insert(token.name(), token.line());
        }
    }

    let mut seen_rules: HashMap<&str, usize> = HashMap::new();
    for rule in grammar.rules() {
        if let Some(first) = seen_rules.get(rule.name()) {
            diags.push(Diagnostic::error(
                rule.line(),
                format!(
                    "duplicate rule '{}' (first defined at line {first})",
                    rule.name()
                ),
            ));
        } else {
            seen_rules.insert(rule.name(), rule.line());
        }
    }
}

fn check_structure(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    if grammar.tokens().is_empty() {
        diags.push(Diagnostic::error(
            grammar.line(),
            "no tokens defined; add a 'tokens:' block with 'NAME: PATTERN' lines",
        ));
    }
    if grammar.rules().is_empty() {
        diags.push(Diagnostic::error(
            grammar.line(),
            "no rules defined; add a 'rule Name:' block",
        ));
    }
    for rule in grammar.rules() {
        if rule.alternatives().is_empty() {
            diags.push(Diagnostic::error(
                rule.line(),
                format!("rule '{}' has no alternatives", rule.name()),
            ));
        }
    }
}

fn check_start_rule(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let starts: Vec<&GrammarRule> = grammar
        .rules()
        .iter()
        .filter(|r| r.is_start())
        .collect();
    match starts.len() {
        0 => {
            if let Some(first) = grammar.rules().first() {
                diags.push(Diagnostic::warning(
                    first.line(),
                    format!(
                        "no start rule defined; using first rule '{}'. Mark your entry rule with 'start rule {}:'",
                        first.name(),
                        first.name()
                    ),
                ));
            }
        }
        1 => {}
        _ => diags.push(Diagnostic::error(
            starts[1].line(),
            "multiple start rules defined; only one rule can be marked with 'start'",
        )),
    }
}

fn check_references(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let defined: HashSet<&str> = grammar
        .rules()
        .iter()
        .map(GrammarRule::name)
        .chain(grammar.tokens().iter().map(|t| t.name()))
        .collect();

    for rule in grammar.rules() {
        for alt in rule.alternatives() {
            for term in alt.terms() {
                let Some(name) = term.reference() else {
                    continue;
                };
                if defined.contains(name) {
                    continue;
                }
                let message = match suggest::nearest(name, defined.iter().copied()) {
                    Some(candidate) => format!(
                        "Undefined reference '{name}'; did you mean '{candidate}'?"
                    ),
                    None => format!("Undefined reference '{name}'"),
                };
                diags.push(Diagnostic::error(rule.line(), message));
            }
        }
    }
}

fn check_token_patterns(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    for token in grammar.tokens() {
        if let Err(err) = Regex::new(&format!(r"\A(?:{})", token.pattern())) {
            diags.push(Diagnostic::error(
                token.line(),
                format!("invalid pattern for token '{}': {err}", token.name()),
            ));
        }
    }
}

fn expr_diagnostics(
    expr: &Expr,
    bindings: &HashSet<&str>,
    context: &str,
    line: usize,
    diags: &mut Vec<Diagnostic>,
) {
    for func in expr.called_funcs() {
        if !BUILTIN_FUNCS.contains(&func) {
            diags.push(Diagnostic::error(
                line,
                format!(
                    "unknown function '{func}' in {context}; available: {}",
                    BUILTIN_FUNCS.join(", ")
                ),
            ));
        }
    }
    for (base, field) in expr.referenced_fields() {
        if Field::from_name(field).is_none() {
            diags.push(Diagnostic::error(
                line,
                format!("unknown token field '{base}.{field}'; available: value, line, column"),
            ));
        }
    }
    for ident in expr.referenced_idents() {
        if !bindings.contains(ident) {
            let message = match suggest::nearest(ident, bindings.iter().copied()) {
                Some(candidate) => format!(
                    "unknown binding '{ident}' in {context}; did you mean '{candidate}'?"
                ),
                None => format!("unknown binding '{ident}' in {context}"),
            };
            diags.push(Diagnostic::error(line, message));
        }
    }
}

fn check_fragments(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    for rule in grammar.rules() {
        for alt in rule.alternatives() {
            let bindings: HashSet<&str> = alt.bindings().collect();

            {
                let context = format!("action of rule '{}'", rule.name());
                for expr in alt.action().expressions() {
                    expr_diagnostics(expr, &bindings, &context, rule.line(), diags);
                }
            }

            if let Some(guard) = alt.guard() {
                // Guard scope additionally sees the action value as `res`
                // and anything the guard itself assigns.
                let mut scope = bindings.clone();
                scope.insert("res");
                for stmt in [Some(guard.then_branch()), guard.else_branch()]
                    .into_iter()
                    .flatten()
                {
                    if let GuardStmt::Assign { name, .. } = stmt {
                        scope.insert(name.as_str());
                    }
                }
                let context = format!("guard of rule '{}'", rule.name());
                for expr in guard.expressions() {
                    expr_diagnostics(expr, &scope, &context, rule.line(), diags);
                }
            }

            if matches!(alt.action(), Action::Pass) && alt.bindings().count() > 1 {
                diags.push(Diagnostic::advice(
                    rule.line(),
                    format!(
                        "'pass' in rule '{}' returns a single value but the alternative binds {} names",
                        rule.name(),
                        alt.bindings().count()
                    ),
                ));
            }
        }
    }
}

fn advisory_naming(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    for token in grammar.tokens() {
        if token.name().chars().any(|c| c.is_ascii_lowercase()) {
            diags.push(Diagnostic::advice(
                token.line(),
                format!("token '{}' is conventionally UPPER_CASE", token.name()),
            ));
        }
    }
    for rule in grammar.rules() {
        let pascal = rule
            .name()
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
            && !rule.name().contains('_');
        if !pascal {
            diags.push(Diagnostic::advice(
                rule.line(),
                format!("rule '{}' is conventionally PascalCase", rule.name()),
            ));
        }
    }
}

fn advisory_unused_tokens(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let mut used: HashSet<&str> = HashSet::new();
    for rule in grammar.rules() {
        for alt in rule.alternatives() {
            for term in alt.terms() {
                match term.object() {
                    TermObject::Reference(name) => used.insert(name.as_str()),
                    // A literal matching a declared token name resolves to
                    // that token.
                    TermObject::Literal(text) => used.insert(text.as_str()),
                };
            }
        }
    }
    for token in grammar.tokens() {
        if !token.is_skip() && !used.contains(token.name()) {
            diags.push(Diagnostic::warning(
                token.line(),
                format!("token '{}' is never used by any rule", token.name()),
            ));
        }
    }
}

fn advisory_shadowed_tokens(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    // Heuristic: a later token whose pattern is plain text can never match
    // if an earlier pattern already covers that exact text.
    let compiled: Vec<Option<Regex>> = grammar
        .tokens()
        .iter()
        .map(|t| Regex::new(&format!(r"\A(?:{})", t.pattern())).ok())
        .collect();

    for (later_idx, later) in grammar.tokens().iter().enumerate() {
        if regex::escape(later.pattern()) != later.pattern() {
            continue;
        }
        for (earlier_idx, earlier) in grammar.tokens().iter().enumerate().take(later_idx) {
            let Some(Some(re)) = compiled.get(earlier_idx) else {
                continue;
            };
            let covers = re
                .find(later.pattern())
                .is_some_and(|m| m.start() == 0 && m.end() == later.pattern().len());
            if covers {
                diags.push(Diagnostic::warning(
                    later.line(),
                    format!(
                        "token '{}' can never match; it is shadowed by earlier token '{}'",
                        later.name(),
                        earlier.name()
                    ),
                ));
                break;
            }
        }
    }
}

fn advisory_unreachable_rules(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let Some(start) = grammar.start_rule() else {
        return;
    };
    let rule_names: HashSet<&str> = grammar.rules().iter().map(GrammarRule::name).collect();

    let mut reached: HashSet<&str> = HashSet::new();
    let mut stack = vec![start.name()];
    while let Some(name) = stack.pop() {
        if !reached.insert(name) {
            continue;
        }
        let Some(rule) = grammar.rule(name) else {
            continue;
        };
        for alt in rule.alternatives() {
            for term in alt.terms() {
                if let Some(target) = term.reference() {
                    if rule_names.contains(target) && !reached.contains(target) {
                        stack.push(target);
                    }
                }
            }
        }
    }

    for rule in grammar.rules() {
        if !reached.contains(rule.name()) {
            diags.push(Diagnostic::warning(
                rule.line(),
                format!(
                    "rule '{}' is unreachable from start rule '{}'",
                    rule.name(),
                    start.name()
                ),
            ));
        }
    }
}

fn advisory_constructor_arity(grammar: &Grammar, diags: &mut Vec<Diagnostic>) {
    let mut arities: HashMap<&str, (usize, usize)> = HashMap::new();
    for rule in grammar.rules() {
        for alt in rule.alternatives() {
            let Action::Construct { name, args } = alt.action() else {
                continue;
            };
            match arities.get(name.as_str()) {
                None => {
                    arities.insert(name.as_str(), (args.len(), rule.line()));
                }
                Some((arity, _)) if *arity == args.len() => {}
                Some((arity, _)) => {
                    diags.push(Diagnostic::warning(
                        rule.line(),
                        format!(
                            "constructor '{name}' is used with differing arities ({arity} and {})",
                            args.len()
                        ),
                    ));
                }
            }
        }
    }
}
