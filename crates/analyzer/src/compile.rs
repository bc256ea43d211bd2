//! Flattening a checked grammar into the runtime arena image.
//!
//! Rules reference each other by name and therefore form cycles; the image
//! breaks them by indexing rules and tokens with dense integer ids and
//! letting terms carry ids instead of owning references.

use crate::recovery;
use parser::{Action, Grammar, Guard, Quantifier, TermObject};
use std::collections::{HashMap, HashSet};

pub type RuleId = usize;
pub type TokenId = usize;

/// One lexer table entry of the compiled image. Synthetic entries are
/// promoted from inline literals; their name is the literal text itself and
/// their pattern is the escaped literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    name: String,
    pattern: String,
    skip: bool,
    synthetic: bool,
}

impl TokenSpec {
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    #[inline]
    pub fn is_skip(&self) -> bool {
        self.skip
    }

    #[must_use]
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }
}

/// What a compiled term matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    Rule(RuleId),
    Token(TokenId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTerm {
    binding: Option<String>,
    matcher: Matcher,
    quantifier: Option<Quantifier>,
    from_literal: bool,
}

impl CompiledTerm {
    #[must_use]
    #[inline]
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    #[must_use]
    #[inline]
    pub fn matcher(&self) -> Matcher {
        self.matcher
    }

    #[must_use]
    #[inline]
    pub fn quantifier(&self) -> Option<Quantifier> {
        self.quantifier
    }

    /// True when the term came from an inline literal; literal values never
    /// participate in `pass` auto-capture.
    #[must_use]
    #[inline]
    pub fn is_from_literal(&self) -> bool {
        self.from_literal
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAlt {
    terms: Vec<CompiledTerm>,
    action: Action,
    guard: Option<Guard>,
}

impl CompiledAlt {
    #[must_use]
    #[inline]
    pub fn terms(&self) -> &[CompiledTerm] {
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
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    name: String,
    alternatives: Vec<CompiledAlt>,
    left_recursive: bool,
    sync: Vec<String>,
}

impl CompiledRule {
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn alternatives(&self) -> &[CompiledAlt] {
        &self.alternatives
    }

    /// Whether the runtime must run the seed-growing loop for this rule.
    #[must_use]
    #[inline]
    pub fn is_left_recursive(&self) -> bool {
        self.left_recursive
    }

    /// Sorted synchronization token names for panic-mode recovery.
    #[must_use]
    #[inline]
    pub fn sync_tokens(&self) -> &[String] {
        &self.sync
    }
}

/// The read-only compiled grammar image shared by the interpreter and the
/// emitter. Safe to share across parses; each parse owns its own state.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGrammar {
    name: String,
    tokens: Vec<TokenSpec>,
    rules: Vec<CompiledRule>,
    start: RuleId,
    rule_index: HashMap<String, RuleId>,
}

impl CompiledGrammar {
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn tokens(&self) -> &[TokenSpec] {
        &self.tokens
    }

    #[must_use]
    #[inline]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    #[must_use]
    #[inline]
    pub fn rule(&self, id: RuleId) -> &CompiledRule {
        &self.rules[id]
    }

    #[must_use]
    #[inline]
    pub fn token(&self, id: TokenId) -> &TokenSpec {
        &self.tokens[id]
    }

    #[must_use]
    #[inline]
    pub fn start(&self) -> RuleId {
        self.start
    }

    #[must_use]
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_index.get(name).copied()
    }
}

/// Compile a checked grammar. Reference terms must resolve; run the checker
/// first.
#[must_use]
pub fn compile(grammar: &Grammar) -> CompiledGrammar {
    let sync = recovery::sync_sets(grammar);

    // Inline literals become synthetic tokens ahead of the user table,
    // longest first so that e.g. '<=' outranks '<'. A literal whose text
    // matches a declared token name resolves to that token instead, which
    // is how an author opts out of the default placement.
    let user_names: HashSet<&str> = grammar.tokens().iter().map(|t| t.name()).collect();
    let mut literals: Vec<String> = Vec::new();
    for rule in grammar.rules() {
        for alt in rule.alternatives() {
            for term in alt.terms() {
                if let TermObject::Literal(text) = term.object() {
                    if !user_names.contains(text.as_str()) && !literals.iter().any(|l| l == text) {
                        literals.push(text.clone());
                    }
                }
            }
        }
    }
    literals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut tokens = Vec::new();
    let mut token_index: HashMap<String, TokenId> = HashMap::new();
    for text in &literals {
        token_index.insert(text.clone(), tokens.len());
        tokens.push(TokenSpec {
            name: text.clone(),
            pattern: regex::escape(text),
            skip: false,
            synthetic: true,
        });
    }
    for decl in grammar.tokens() {
        token_index.insert(decl.name().to_string(), tokens.len());
        tokens.push(TokenSpec {
            name: decl.name().to_string(),
            pattern: decl.pattern().to_string(),
            skip: decl.is_skip(),
            synthetic: false,
        });
    }

    let rule_index: HashMap<String, RuleId> = grammar
        .rules()
        .iter()
        .enumerate()
        .map(|(id, rule)| (rule.name().to_string(), id))
        .collect();

    let rules = grammar
        .rules()
        .iter()
        .map(|rule| {
            let alternatives = rule
                .alternatives()
                .iter()
                .map(|alt| {
                    let terms = alt
                        .terms()
                        .iter()
                        .map(|term| {
                            let (matcher, from_literal) = match term.object() {
                                TermObject::Reference(name) => {
                                    let matcher = rule_index
                                        .get(name.as_str())
                                        .copied()
                                        .map(Matcher::Rule)
                                        .or_else(|| {
                                            token_index
                                                .get(name.as_str())
                                                .copied()
                                                .map(Matcher::Token)
                                        })
                                        .expect("unresolved reference survived checking");
                                    (matcher, false)
                                }
                                TermObject::Literal(text) => (
                                    Matcher::Token(
                                        token_index[text.as_str()],
                                    ),
                                    true,
                                ),
                            };
                            CompiledTerm {
                                binding: term.binding().map(str::to_string),
                                matcher,
                                quantifier: term.quantifier(),
                                from_literal,
                            }
                        })
                        .collect();
                    CompiledAlt {
                        terms,
                        action: alt.action().clone(),
                        guard: alt.guard().cloned(),
                    }
                })
                .collect();

            let left_recursive = rule
                .alternatives()
                .iter()
                .any(|alt| alt.leading_reference() == Some(rule.name()));

            CompiledRule {
                name: rule.name().to_string(),
                alternatives,
                left_recursive,
                sync: sync
                    .get(rule.name())
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let start = grammar
        .start_rule()
        .and_then(|rule| rule_index.get(rule.name()).copied())
        .expect("grammar without rules survived checking");

    CompiledGrammar {
        name: grammar.name().to_string(),
        tokens,
        rules,
        start,
        rule_index,
    }
}
