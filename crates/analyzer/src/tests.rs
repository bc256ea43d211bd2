use crate::{analyze, Matcher, Severity};
use parser::parse_str;

fn first_grammar(src: &str) -> parser::Grammar {
    let parsed = parse_str(src);
    assert!(parsed.is_clean(), "{:?}", parsed.errors());
    parsed.grammars()[0].clone()
}

const CALC: &str = r#"
grammar Calc:
    tokens:
        NUMBER: \d+
        PLUS: \+
        WS: skip \s+
    end

    start rule Expr:
        | l:Expr PLUS r:Term -> Add(l, r)
        | t:Term -> pass
    end

    rule Term:
        | n:NUMBER -> Num(int(n))
    end
end
"#;

#[test]
fn clean_grammar_compiles() {
    let analysis = analyze(&first_grammar(CALC));
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics());
    let compiled = analysis.compiled().expect("compiled image");
    assert_eq!(compiled.name(), "Calc");
    assert_eq!(compiled.rules().len(), 2);
    assert_eq!(compiled.rule(compiled.start()).name(), "Expr");
}

#[test]
fn left_recursion_is_marked() {
    let analysis = analyze(&first_grammar(CALC));
    let compiled = analysis.compiled().unwrap();
    let expr = compiled.rule(compiled.rule_id("Expr").unwrap());
    assert!(expr.is_left_recursive());
    let term = compiled.rule(compiled.rule_id("Term").unwrap());
    assert!(!term.is_left_recursive());
}

#[test]
fn undefined_reference_gets_suggestion() {
    let src = r#"
grammar G:
    tokens:
        X: a
    end
    start rule Foe:
        | X -> pass
    end
    rule Bar:
        | f:Foo -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(analysis.has_errors());
    assert!(analysis.compiled().is_none());
    let message = analysis
        .diagnostics()
        .iter()
        .find(|d| d.is_fatal())
        .unwrap()
        .message();
    assert_eq!(message, "Undefined reference 'Foo'; did you mean 'Foe'?");
}

#[test]
fn duplicate_definitions_are_fatal() {
    let src = r#"
grammar G:
    tokens:
        X: a
        X: b
    end
    start rule R:
        | X -> pass
    end
    rule R:
        | X -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    let fatal: Vec<_> = analysis
        .diagnostics()
        .iter()
        .filter(|d| d.is_fatal())
        .collect();
    assert_eq!(fatal.len(), 2);
    assert!(fatal[0].message().contains("duplicate token 'X'"));
    assert!(fatal[1].message().contains("duplicate rule 'R'"));
}

#[test]
fn multiple_start_rules_are_fatal() {
    let src = r#"
grammar G:
    tokens:
        X: a
    end
    start rule A:
        | X -> pass
    end
    start rule B:
        | X -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.is_fatal() && d.message().contains("multiple start rules")));
}

#[test]
fn implicit_start_warns_and_uses_first_rule() {
    let src = r#"
grammar G:
    tokens:
        X: a
    end
    rule First:
        | X -> pass
    end
    rule Second:
        | f:First -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(!analysis.has_errors());
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.severity() == Severity::Warning && d.message().contains("no start rule")));
    let compiled = analysis.compiled().unwrap();
    assert_eq!(compiled.rule(compiled.start()).name(), "First");
}

#[test]
fn invalid_token_pattern_is_fatal() {
    let src = r#"
grammar G:
    tokens:
        BAD: [unclosed
    end
    start rule R:
        | BAD -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.is_fatal() && d.message().contains("invalid pattern for token 'BAD'")));
}

#[test]
fn unknown_function_and_binding_are_fatal() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule R:
        | n:NUMBER -> Num(print(n))
        | m:NUMBER -> Num(int(x))
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    let messages: Vec<_> = analysis
        .diagnostics()
        .iter()
        .filter(|d| d.is_fatal())
        .map(|d| d.message().to_string())
        .collect();
    assert!(messages.iter().any(|m| m.contains("unknown function 'print'")));
    assert!(messages.iter().any(|m| m.contains("unknown binding 'x'")));
}

#[test]
fn advisories_are_not_fatal() {
    let src = r#"
grammar G:
    tokens:
        num: \d+
        UNUSED: xyz
    end
    start rule expr_thing:
        | a:num b:num -> pass
    end
    rule Orphan:
        | n:num -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics());
    let messages: Vec<_> = analysis
        .diagnostics()
        .iter()
        .map(|d| d.message().to_string())
        .collect();
    assert!(messages.iter().any(|m| m.contains("UPPER_CASE")));
    assert!(messages.iter().any(|m| m.contains("PascalCase")));
    assert!(messages.iter().any(|m| m.contains("never used")));
    assert!(messages.iter().any(|m| m.contains("unreachable")));
    assert!(messages
        .iter()
        .any(|m| m.contains("'pass'") && m.contains("binds 2 names")));
}

#[test]
fn token_shadowing_is_flagged() {
    let src = r#"
grammar G:
    tokens:
        WORD: [a-z]+
        IF: if
    end
    start rule R:
        | WORD -> pass
        | IF -> pass
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.severity() == Severity::Warning
            && d.message().contains("shadowed by earlier token 'WORD'")));
}

#[test]
fn constructor_arity_conflict_is_flagged() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule A:
        | n:NUMBER -> Num(n)
    end
    rule B:
        | n:NUMBER m:NUMBER -> Num(n, m)
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    assert!(analysis
        .diagnostics()
        .iter()
        .any(|d| d.message().contains("differing arities (1 and 2)")));
}

#[test]
fn literals_become_synthetic_tokens_longest_first() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
        WS: skip \s+
    end
    start rule Cmp:
        | l:NUMBER '<' r:NUMBER -> Lt(l, r)
        | l:NUMBER '<=' r:NUMBER -> Le(l, r)
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    let compiled = analysis.compiled().unwrap();
    let names: Vec<_> = compiled.tokens().iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["<=", "<", "NUMBER", "WS"]);
    assert!(compiled.tokens()[0].is_synthetic());
    assert_eq!(compiled.tokens()[1].pattern(), "<");
    // '<=' must keep its escaped form.
    assert!(!compiled.tokens()[0].pattern().contains('['));
}

#[test]
fn literal_matching_declared_token_reuses_it() {
    let src = r#"
grammar G:
    tokens:
        IF: if
        ID: [a-z]+
        WS: skip \s+
    end
    start rule R:
        | 'if' x:ID -> If(x)
    end
end
"#;
    let analysis = analyze(&first_grammar(src));
    let compiled = analysis.compiled().unwrap();
    // No synthetic entry: the literal resolves to the declared IF token.
    assert!(compiled.tokens().iter().all(|t| !t.is_synthetic()));
    let rule = compiled.rule(compiled.start());
    let term = &rule.alternatives()[0].terms()[0];
    match term.matcher() {
        Matcher::Token(id) => assert_eq!(compiled.token(id).name(), "IF"),
        Matcher::Rule(_) => panic!("literal resolved to a rule"),
    }
}

#[test]
fn sync_sets_are_sorted_and_deterministic() {
    let analysis = analyze(&first_grammar(CALC));
    let compiled = analysis.compiled().unwrap();
    for rule in compiled.rules() {
        let sync = rule.sync_tokens();
        let mut sorted = sync.to_vec();
        sorted.sort();
        assert_eq!(sync, sorted.as_slice());
        assert!(sync.contains(&"EOF".to_string()));
    }
}
