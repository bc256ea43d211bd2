//! Synchronization-token analysis for panic-mode recovery.
//!
//! FIRST and FOLLOW sets are computed by fixed-point iteration over the
//! rule graph; a rule's sync set is where the parser fast-forwards to after
//! recording an error inside that rule. `EOF` is a member of every relevant
//! set so recovery always terminates at end of input.

use parser::{Grammar, Quantifier, Term, TermObject};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Pseudo token name for end of input.
pub const EOF: &str = "EOF";

fn term_symbol(term: &Term) -> &str {
    match term.object() {
        TermObject::Reference(name) => name,
        TermObject::Literal(text) => text,
    }
}

fn term_nullable(term: &Term, nullable_rules: &HashSet<String>) -> bool {
    if matches!(
        term.quantifier(),
        Some(Quantifier::Optional) | Some(Quantifier::Star)
    ) {
        return true;
    }
    match term.object() {
        TermObject::Reference(name) => nullable_rules.contains(name),
        TermObject::Literal(_) => false,
    }
}

fn nullable_rules(grammar: &Grammar) -> HashSet<String> {
    let mut nullable = HashSet::new();
    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            if nullable.contains(rule.name()) {
                continue;
            }
            let rule_nullable = rule
                .alternatives()
                .iter()
                .any(|alt| alt.terms().iter().all(|t| term_nullable(t, &nullable)));
            if rule_nullable {
                nullable.insert(rule.name().to_string());
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn symbol_first<'a>(
    symbol: &'a str,
    is_rule: bool,
    first: &HashMap<String, BTreeSet<String>>,
) -> BTreeSet<String> {
    if is_rule {
        first.get(symbol).cloned().unwrap_or_default()
    } else {
        BTreeSet::from([symbol.to_string()])
    }
}

/// Per-rule synchronization sets, keyed by rule name, with deterministic
/// (sorted) membership.
pub fn sync_sets(grammar: &Grammar) -> HashMap<String, BTreeSet<String>> {
    let rule_names: HashSet<&str> = grammar.rules().iter().map(|r| r.name()).collect();
    let nullable = nullable_rules(grammar);

    // FIRST, by fixed point.
    let mut first: HashMap<String, BTreeSet<String>> = grammar
        .rules()
        .iter()
        .map(|r| (r.name().to_string(), BTreeSet::new()))
        .collect();
    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            let mut addition = BTreeSet::new();
            for alt in rule.alternatives() {
                for term in alt.terms() {
                    let symbol = term_symbol(term);
                    addition.extend(symbol_first(
                        symbol,
                        rule_names.contains(symbol),
                        &first,
                    ));
                    if !term_nullable(term, &nullable) {
                        break;
                    }
                }
            }
            let set = first.get_mut(rule.name()).expect("rule in first map");
            let before = set.len();
            set.extend(addition);
            changed |= set.len() != before;
        }
        if !changed {
            break;
        }
    }

    // FOLLOW, by fixed point; the start rule is followed by end of input.
    let mut follow: HashMap<String, BTreeSet<String>> = grammar
        .rules()
        .iter()
        .map(|r| (r.name().to_string(), BTreeSet::new()))
        .collect();
    if let Some(start) = grammar.start_rule() {
        follow
            .get_mut(start.name())
            .expect("start rule in follow map")
            .insert(EOF.to_string());
    }
    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            for alt in rule.alternatives() {
                let terms = alt.terms();
                for (i, term) in terms.iter().enumerate() {
                    let TermObject::Reference(name) = term.object() else {
                        continue;
                    };
                    if !rule_names.contains(name.as_str()) {
                        continue;
                    }
                    let mut addition = BTreeSet::new();
                    let mut all_nullable = true;
                    for following in &terms[i + 1..] {
                        let symbol = term_symbol(following);
                        addition.extend(symbol_first(
                            symbol,
                            rule_names.contains(symbol),
                            &first,
                        ));
                        if !term_nullable(following, &nullable) {
                            all_nullable = false;
                            break;
                        }
                    }
                    if all_nullable {
                        addition.extend(follow[rule.name()].iter().cloned());
                    }
                    let set = follow.get_mut(name).expect("referenced rule in follow map");
                    let before = set.len();
                    set.extend(addition);
                    changed |= set.len() != before;
                }
            }
        }
        if !changed {
            break;
        }
    }

    // Sync = FOLLOW(rule) + the leading FIRSTs of its own alternatives +
    // FIRST of every rule (a statement boundary is a good place to resume),
    // always including EOF.
    let all_rule_firsts: BTreeSet<String> =
        first.values().flat_map(|set| set.iter().cloned()).collect();

    grammar
        .rules()
        .iter()
        .map(|rule| {
            let mut sync = follow[rule.name()].clone();
            for alt in rule.alternatives() {
                if let Some(term) = alt.terms().first() {
                    let symbol = term_symbol(term);
                    sync.extend(symbol_first(symbol, rule_names.contains(symbol), &first));
                }
            }
            sync.extend(all_rule_firsts.iter().cloned());
            sync.insert(EOF.to_string());
            (rule.name().to_string(), sync)
        })
        .collect()
}
