use crate::fragment::CmpOp;
use crate::{
    parse_str, Action, Expectation, Expr, Grammar, GuardStmt, Pattern, Quantifier, TermObject,
};

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

    test Math:
        "10 + 20" => Yields(Add(Num(10), Num(20)))
        "1+" => Fail
    end
end
"#;

fn parse_one(src: &str) -> Grammar {
    let parsed = parse_str(src);
    assert!(
        parsed.is_clean(),
        "unexpected syntax errors: {:?}",
        parsed.errors()
    );
    assert_eq!(parsed.grammars().len(), 1);
    parsed.grammars()[0].clone()
}

#[test]
fn calculator_structure() {
    let grammar = parse_one(CALC);
    assert_eq!(grammar.name(), "Calc");
    assert_eq!(grammar.tokens().len(), 3);
    assert_eq!(grammar.tokens()[0].name(), "NUMBER");
    assert_eq!(grammar.tokens()[0].pattern(), r"\d+");
    assert!(!grammar.tokens()[0].is_skip());
    assert!(grammar.tokens()[2].is_skip());
    assert_eq!(grammar.tokens()[2].pattern(), r"\s+");

    assert_eq!(grammar.rules().len(), 2);
    let expr = &grammar.rules()[0];
    assert!(expr.is_start());
    assert_eq!(expr.name(), "Expr");
    assert_eq!(expr.alternatives().len(), 2);
    assert_eq!(expr.alternatives()[0].leading_reference(), Some("Expr"));

    let term = &grammar.rules()[1];
    let alt = &term.alternatives()[0];
    assert_eq!(alt.terms()[0].binding(), Some("n"));
    match alt.action() {
        Action::Construct { name, args } => {
            assert_eq!(name, "Num");
            assert_eq!(args.len(), 1);
            match &args[0] {
                Expr::Call { func, arg } => {
                    assert_eq!(func, "int");
                    assert_eq!(**arg, Expr::Ident("n".into()));
                }
                other => panic!("expected call argument, got {other:?}"),
            }
        }
        other => panic!("expected constructor action, got {other:?}"),
    }

    assert_eq!(grammar.suites().len(), 1);
    let suite = &grammar.suites()[0];
    assert_eq!(suite.name(), "Math");
    assert_eq!(suite.target_rule(), None);
    assert_eq!(suite.cases().len(), 2);
    match suite.cases()[0].expectation() {
        Expectation::Yields(Pattern::Node { name, args, open }) => {
            assert_eq!(name, "Add");
            assert_eq!(args.len(), 2);
            assert!(!open);
        }
        other => panic!("expected Yields, got {other:?}"),
    }
    assert_eq!(*suite.cases()[1].expectation(), Expectation::Fail);
}

#[test]
fn token_pattern_keeps_embedded_whitespace() {
    let grammar = parse_one(
        "grammar G:\n    tokens:\n        PHRASE: foo  bar   # trailing comment\n    end\nend\n",
    );
    assert_eq!(grammar.tokens()[0].pattern(), "foo  bar");
}

#[test]
fn inline_literals_and_quantifiers() {
    let grammar = parse_one(
        r#"
grammar Stmts:
    tokens:
        ID: [a-z]+
        WS: skip \s+
    end

    start rule Stmt:
        | "if" c:ID 'then'? body:Stmt* -> If(c, body)
        | x:ID -> pass
    end
end
"#,
    );
    let alt = &grammar.rules()[0].alternatives()[0];
    assert_eq!(alt.terms().len(), 4);
    assert_eq!(*alt.terms()[0].object(), TermObject::Literal("if".into()));
    assert_eq!(alt.terms()[2].quantifier(), Some(Quantifier::Optional));
    assert_eq!(alt.terms()[3].quantifier(), Some(Quantifier::Star));
    assert_eq!(alt.terms()[3].binding(), Some("body"));
}

#[test]
fn quote_doubling_in_literals() {
    let grammar = parse_one(
        "grammar Q:\n    tokens:\n        ID: [a-z]+\n    end\n    start rule R:\n        | 'it''s' -> pass\n    end\nend\n",
    );
    let alt = &grammar.rules()[0].alternatives()[0];
    assert_eq!(*alt.terms()[0].object(), TermObject::Literal("it's".into()));
}

#[test]
fn guard_single_line() {
    let grammar = parse_one(
        r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n)) check int(n) > 0 then pass else then error('must be positive')
    end
end
"#,
    );
    let guard = grammar.rules()[0].alternatives()[0]
        .guard()
        .expect("guard parsed");
    match guard.condition() {
        Expr::Compare { op, .. } => assert_eq!(*op, CmpOp::Gt),
        other => panic!("expected comparison, got {other:?}"),
    }
    assert_eq!(*guard.then_branch(), GuardStmt::Pass);
    assert_eq!(
        guard.else_branch(),
        Some(&GuardStmt::Error("must be positive".into()))
    );
}

#[test]
fn guard_spanning_lines() {
    let grammar = parse_one(
        r#"
grammar G:
    tokens:
        ID: [a-z]+
    end
    rule Test:
        | x:ID -> pass
          check
            len(x) > 0
          then
            pass
          else then res = 0
    end
end
"#,
    );
    let guard = grammar.rules()[0].alternatives()[0]
        .guard()
        .expect("multi-line guard parsed");
    assert_eq!(*guard.then_branch(), GuardStmt::Pass);
    assert_eq!(
        guard.else_branch(),
        Some(&GuardStmt::Assign {
            name: "res".into(),
            value: Expr::Int(0),
        })
    );
}

#[test]
fn bare_expression_actions() {
    let grammar = parse_one(
        r#"
grammar G:
    tokens:
        NUMBER: \d+
        ID: [a-z]+
    end
    start rule R:
        | x:ID -> x
        | n:NUMBER -> int(n)
        | "foo" -> 'matched'
    end
end
"#,
    );
    let alts = grammar.rules()[0].alternatives();
    assert_eq!(*alts[0].action(), Action::Value(Expr::Ident("x".into())));
    match alts[1].action() {
        Action::Value(Expr::Call { func, .. }) => assert_eq!(func, "int"),
        other => panic!("expected builtin call action, got {other:?}"),
    }
    assert_eq!(
        *alts[2].action(),
        Action::Value(Expr::Str("matched".into()))
    );
}

#[test]
fn yields_wildcards() {
    let grammar = parse_one(
        r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n))
    end
    test T:
        "1" => Yields(Num(...))
        "2" => Yields(...)
    end
end
"#,
    );
    let cases = grammar.suites()[0].cases();
    match cases[0].expectation() {
        Expectation::Yields(Pattern::Node { args, open, .. }) => {
            assert!(args.is_empty());
            assert!(open);
        }
        other => panic!("expected open node pattern, got {other:?}"),
    }
    assert_eq!(*cases[1].expectation(), Expectation::Yields(Pattern::Wildcard));
}

#[test]
fn suite_targets_named_rule() {
    let grammar = parse_one(
        r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | t:T -> pass
    end
    rule T:
        | n:NUMBER -> pass
    end
    test Terms T:
        "7" => Success
    end
end
"#,
    );
    assert_eq!(grammar.suites()[0].target_rule(), Some("T"));
}

#[test]
fn multiple_grammars_per_file() {
    let src = r#"
grammar A:
    tokens:
        X: a
    end
    start rule R:
        | X -> pass
    end
end

grammar B:
    tokens:
        Y: b
    end
    start rule S:
        | Y -> pass
    end
end
"#;
    let parsed = parse_str(src);
    assert!(parsed.is_clean());
    let names: Vec<_> = parsed.grammars().iter().map(Grammar::name).collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn recovery_reports_multiple_errors_and_keeps_good_blocks() {
    let src = r#"
grammar Broken:
    tokens:
        NUMBER: \d+
    end

    rule Bad:
        | this is not an alternative
    end

    start rule Good:
        | n:NUMBER -> pass
    end

    test AlsoBad:
        "1" => Maybe
    end
end
"#;
    let parsed = parse_str(src);
    assert!(parsed.errors().len() >= 2, "errors: {:?}", parsed.errors());
    assert_eq!(parsed.grammars().len(), 1);
    let grammar = &parsed.grammars()[0];
    assert_eq!(grammar.name(), "Broken");
    // The broken rule and test blocks are dropped; the rest survives.
    assert_eq!(grammar.rules().len(), 1);
    assert_eq!(grammar.rules()[0].name(), "Good");
    assert_eq!(grammar.tokens().len(), 1);
    assert!(grammar.suites().is_empty());
    // Error lines point into the original file.
    assert!(parsed.errors().iter().any(|e| e.line >= 7));
}

#[test]
fn missing_end_is_reported() {
    let parsed = parse_str("grammar Unclosed:\n    tokens:\n        X: a\n    end\n");
    assert!(!parsed.is_clean());
    assert!(parsed
        .errors()
        .iter()
        .any(|e| e.message.contains("missing its closing 'end'")));
}

#[test]
fn display_round_trips() {
    let grammar = parse_one(CALC);
    let rendered = grammar.to_string();
    let reparsed = parse_str(&rendered);
    assert!(
        reparsed.is_clean(),
        "rendered grammar failed to reparse: {:?}\n{rendered}",
        reparsed.errors()
    );
    // Structural equality modulo source positions: the canonical rendering
    // of the reparsed model must be identical.
    assert_eq!(reparsed.grammars()[0].to_string(), rendered);
}

#[test]
fn line_numbers_are_absolute() {
    let grammar = parse_one(CALC);
    assert_eq!(grammar.tokens()[0].line(), 4);
    assert_eq!(grammar.rules()[0].line(), 9);
    assert_eq!(grammar.suites()[0].cases()[0].line(), 19);
}
