//! The packrat parser core: ordered choice, memoization, seed-growing for
//! direct left recursion, and panic-mode recovery.

use crate::eval::eval_expr;
use crate::lexer::Lexed;
use crate::result::{ParseError, ParseResult};
use crate::value::{ErrorNode, Token, Value};
use crate::Engine;
use analyzer::{CompiledAlt, CompiledGrammar, CompiledRule, CompiledTerm, Matcher, RuleId};
use parser::{Action, GuardStmt, Quantifier};
use std::collections::HashMap;
use tracing::trace;

/// A failed match: message, token-stream position, and whether the message
/// came from user code (guard `error(…)` or a fragment evaluation), which
/// makes it preferred for reporting.
#[derive(Debug, Clone)]
struct Failure {
    message: String,
    pos: usize,
    custom: bool,
}

#[derive(Debug, Clone)]
enum MemoEntry {
    Done(Result<(Value, usize), Failure>),
    /// Left-recursion marker: the current seed, if any growth happened yet.
    Growing(Option<(Value, usize)>),
}

struct Ctx<'g> {
    grammar: &'g CompiledGrammar,
    tokens: Vec<Token>,
    end: (usize, usize),
    pos: usize,
    memo: HashMap<(RuleId, usize), MemoEntry>,
    errors: Vec<ParseError>,
    recovery: bool,
    entry: RuleId,
    furthest: Option<Failure>,
}

pub(crate) fn run(engine: &Engine, entry: RuleId, lexed: Lexed) -> ParseResult {
    let Lexed {
        tokens,
        errors: lex_errors,
        end,
    } = lexed;

    let mut ctx = Ctx {
        grammar: engine.grammar(),
        tokens,
        end,
        pos: 0,
        memo: HashMap::new(),
        errors: Vec::new(),
        recovery: engine.options().recovery,
        entry,
        furthest: None,
    };

    let ast = match ctx.apply_rule(entry) {
        Ok(value) => {
            if ctx.pos < ctx.tokens.len() {
                // The rule matched a prefix; report the most advanced
                // failure if one got further than the leftover token.
                let failure = match &ctx.furthest {
                    Some(f) if f.pos >= ctx.pos => f.clone(),
                    _ => {
                        let token = &ctx.tokens[ctx.pos];
                        Failure {
                            message: format!(
                                "expected end of input, found {}",
                                token.name()
                            ),
                            pos: ctx.pos,
                            custom: false,
                        }
                    }
                };
                ctx.record(&failure);
            }
            value
        }
        Err(failure) => {
            let failure = match &ctx.furthest {
                Some(f) if f.pos > failure.pos && !failure.custom => f.clone(),
                _ => failure,
            };
            ctx.record(&failure);
            Value::Null
        }
    };

    let mut errors = lex_errors;
    errors.extend(ctx.errors);
    ParseResult::new(ast, errors, ctx.tokens)
}

impl<'g> Ctx<'g> {
    /// Line/column of a token-stream position; past the last token this is
    /// the end of input.
    fn position(&self, pos: usize) -> (usize, usize) {
        match self.tokens.get(pos) {
            Some(token) => (token.line(), token.column()),
            None => self.end,
        }
    }

    fn fail(&mut self, message: impl Into<String>, pos: usize, custom: bool) -> Failure {
        let failure = Failure {
            message: message.into(),
            pos,
            custom,
        };
        self.note(&failure);
        failure
    }

    fn note(&mut self, failure: &Failure) {
        let better = match &self.furthest {
            None => true,
            Some(current) => {
                failure.pos > current.pos || (failure.pos == current.pos && failure.custom)
            }
        };
        if better {
            self.furthest = Some(failure.clone());
        }
    }

    fn record(&mut self, failure: &Failure) {
        let (line, column) = self.position(failure.pos);
        self.errors
            .push(ParseError::new(failure.message.clone(), line, column));
    }

    /// Invoke a rule at the current position, going through the memo table.
    fn apply_rule(&mut self, id: RuleId) -> Result<Value, Failure> {
        let key = (id, self.pos);
        match self.memo.get(&key) {
            Some(MemoEntry::Done(Ok((value, end)))) => {
                self.pos = *end;
                return Ok(value.clone());
            }
            Some(MemoEntry::Done(Err(failure))) => return Err(failure.clone()),
            Some(MemoEntry::Growing(seed)) => {
                // Recursive re-entry during growth: hand back the seed.
                return match seed {
                    Some((value, end)) => {
                        self.pos = *end;
                        Ok(value.clone())
                    }
                    None => Err(Failure {
                        message: format!(
                            "left recursion in rule '{}' with no seed",
                            self.grammar.rule(id).name()
                        ),
                        pos: self.pos,
                        custom: false,
                    }),
                };
            }
            None => {}
        }

        let start = self.pos;
        trace!(rule = self.grammar.rule(id).name(), pos = start, "enter");

        if !self.grammar.rule(id).is_left_recursive() {
            // The seedless marker turns same-position re-entry (indirect
            // left recursion, which the checker does not detect) into a
            // parse failure instead of unbounded recursion.
            self.memo.insert(key, MemoEntry::Growing(None));
            let outcome = self.eval_rule_body(id, start);
            let entry = match &outcome {
                Ok(value) => MemoEntry::Done(Ok((value.clone(), self.pos))),
                Err(failure) => MemoEntry::Done(Err(failure.clone())),
            };
            self.memo.insert(key, entry);
            return outcome;
        }

        // Seed-growing (Warth et al.): start from a failure seed, re-run the
        // body while each pass consumes more than the seed, then commit the
        // best parse.
        self.memo.insert(key, MemoEntry::Growing(None));
        let mut best: Option<(Value, usize)> = None;
        loop {
            self.pos = start;
            match self.eval_rule_body(id, start) {
                Ok(value) => {
                    let end = self.pos;
                    if best.as_ref().is_some_and(|(_, best_end)| end <= *best_end) {
                        break;
                    }
                    best = Some((value, end));
                    self.memo.insert(key, MemoEntry::Growing(best.clone()));
                }
                Err(failure) => {
                    if best.is_none() {
                        self.memo.insert(key, MemoEntry::Done(Err(failure.clone())));
                        self.pos = start;
                        return Err(failure);
                    }
                    break;
                }
            }
        }

        let (value, end) = best.expect("grow loop without a seed");
        self.pos = end;
        self.memo
            .insert(key, MemoEntry::Done(Ok((value.clone(), end))));
        Ok(value)
    }

    /// Ordered choice over the rule's alternatives, with panic-mode recovery
    /// when every alternative fails.
    fn eval_rule_body(&mut self, id: RuleId, start: usize) -> Result<Value, Failure> {
        let rule = self.grammar.rule(id);
        let mut failures: Vec<Failure> = Vec::new();

        for alt in rule.alternatives() {
            self.pos = start;
            let error_snapshot = self.errors.len();
            match self.eval_alternative(alt) {
                Ok(value) => {
                    if self.recovery && value.is_error() {
                        // An error node as the alternative's own value means
                        // the interesting part failed; try the next one.
                        self.errors.truncate(error_snapshot);
                        failures.push(Failure {
                            message: format!("no alternative matched for rule '{}'", rule.name()),
                            pos: self.pos,
                            custom: false,
                        });
                        continue;
                    }
                    return Ok(value);
                }
                Err(failure) => {
                    self.errors.truncate(error_snapshot);
                    failures.push(failure);
                }
            }
        }

        self.pos = start;
        let deepest = failures.iter().map(|f| f.pos).max().unwrap_or(start);
        let failure = failures
            .iter()
            .find(|f| f.custom)
            .cloned()
            .unwrap_or_else(|| Failure {
                message: format!("no alternative matched for rule '{}'", rule.name()),
                pos: deepest,
                custom: false,
            });
        self.note(&failure);

        // Recover only when the failure got past the rule's first token, or
        // when this is the entry rule and giving up would end the parse.
        if self.recovery && (id == self.entry || deepest > start) {
            self.record(&failure);
            let (line, column) = self.position(failure.pos);
            self.pos = deepest;
            self.skip_to_sync(rule);
            let node = ErrorNode::new(failure.message, line, column, self.pos - start);
            return Ok(Value::Error(node));
        }

        Err(failure)
    }

    /// Advance to the nearest synchronization token of `rule` (end of input
    /// always synchronizes). The sync token itself is left for the resumed
    /// parse to consume.
    fn skip_to_sync(&mut self, rule: &CompiledRule) {
        while let Some(token) = self.tokens.get(self.pos) {
            if rule
                .sync_tokens()
                .binary_search_by(|name| name.as_str().cmp(token.name()))
                .is_ok()
            {
                break;
            }
            self.pos += 1;
        }
    }

    fn eval_alternative(&mut self, alt: &'g CompiledAlt) -> Result<Value, Failure> {
        let mut scope: HashMap<String, Value> = HashMap::new();
        let mut term_values: Vec<Value> = Vec::with_capacity(alt.terms().len());

        for term in alt.terms() {
            let value = self.eval_term(term)?;
            if let Some(name) = term.binding() {
                scope.insert(name.to_string(), value.clone());
            }
            term_values.push(value);
        }

        let mut value = match alt.action() {
            Action::Pass => {
                let mut bound = alt
                    .terms()
                    .iter()
                    .zip(&term_values)
                    .filter(|(term, _)| term.binding().is_some());
                match (bound.next(), bound.next()) {
                    (Some((_, value)), None) => value.clone(),
                    _ => {
                        let mut plain = alt
                            .terms()
                            .iter()
                            .zip(&term_values)
                            .filter(|(term, _)| !term.is_from_literal());
                        match (plain.next(), plain.next()) {
                            (Some((_, value)), None) => value.clone(),
                            _ => Value::Null,
                        }
                    }
                }
            }
            Action::Construct { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let value = eval_expr(arg, &scope)
                        .map_err(|e| self.fail(e.0, self.pos, true))?;
                    values.push(value);
                }
                Value::Node {
                    name: name.clone(),
                    args: values,
                }
            }
            Action::Value(expr) => {
                eval_expr(expr, &scope).map_err(|e| self.fail(e.0, self.pos, true))?
            }
        };

        if let Some(guard) = alt.guard() {
            scope.insert("res".to_string(), value);
            let condition = eval_expr(guard.condition(), &scope)
                .map_err(|e| self.fail(e.0, self.pos, true))?;
            let branch = if condition.truthy() {
                Some(guard.then_branch())
            } else {
                guard.else_branch()
            };
            if let Some(stmt) = branch {
                match stmt {
                    GuardStmt::Pass => {}
                    GuardStmt::Error(message) => {
                        return Err(self.fail(message.clone(), self.pos, true));
                    }
                    GuardStmt::Assign { name, value: expr } => {
                        let assigned = eval_expr(expr, &scope)
                            .map_err(|e| self.fail(e.0, self.pos, true))?;
                        scope.insert(name.clone(), assigned);
                    }
                    GuardStmt::Eval(expr) => {
                        eval_expr(expr, &scope).map_err(|e| self.fail(e.0, self.pos, true))?;
                    }
                }
            }
            value = scope.remove("res").expect("guard scope keeps res");
        }

        Ok(value)
    }

    fn eval_term(&mut self, term: &CompiledTerm) -> Result<Value, Failure> {
        match term.quantifier() {
            None => self.eval_base(term.matcher()),
            Some(Quantifier::Optional) => {
                let save = self.pos;
                match self.eval_base(term.matcher()) {
                    Ok(value) => Ok(value),
                    Err(_) => {
                        self.pos = save;
                        Ok(Value::Null)
                    }
                }
            }
            Some(Quantifier::Star) => Ok(Value::List(self.eval_repeat(term.matcher()))),
            Some(Quantifier::Plus) => {
                let first = self.eval_base(term.matcher())?;
                let mut items = vec![first];
                items.extend(self.eval_repeat(term.matcher()));
                Ok(Value::List(items))
            }
        }
    }

    /// Greedy zero-or-more. Stops on failure or when a match does not
    /// advance, which bounds repetition over empty matches.
    fn eval_repeat(&mut self, matcher: Matcher) -> Vec<Value> {
        let mut items = Vec::new();
        loop {
            let save = self.pos;
            match self.eval_base(matcher) {
                Ok(value) => {
                    items.push(value);
                    if self.pos == save {
                        break;
                    }
                }
                Err(_) => {
                    self.pos = save;
                    break;
                }
            }
        }
        items
    }

    fn eval_base(&mut self, matcher: Matcher) -> Result<Value, Failure> {
        match matcher {
            Matcher::Rule(id) => self.apply_rule(id),
            Matcher::Token(id) => {
                let spec = self.grammar.token(id);
                match self.tokens.get(self.pos) {
                    Some(token) if token.name() == spec.name() => {
                        let token = token.clone();
                        self.pos += 1;
                        Ok(Value::Token(token))
                    }
                    found => {
                        let wanted = if spec.is_synthetic() {
                            format!("'{}'", spec.name())
                        } else {
                            spec.name().to_string()
                        };
                        let found = match found {
                            Some(token) => token.name().to_string(),
                            None => "end of input".to_string(),
                        };
                        let pos = self.pos;
                        Err(self.fail(format!("expected {wanted}, found {found}"), pos, false))
                    }
                }
            }
        }
    }
}
