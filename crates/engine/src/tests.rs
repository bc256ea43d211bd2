use crate::{Engine, EngineOptions, ParseResult, Value, ERROR_TOKEN};
use analyzer::{analyze, CompiledGrammar};
use parser::parse_str;

fn compiled(src: &str) -> CompiledGrammar {
    let parsed = parse_str(src);
    assert!(parsed.is_clean(), "{:?}", parsed.errors());
    let analysis = analyze(&parsed.grammars()[0]);
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics());
    analysis.into_parts().1.expect("compiled grammar")
}

fn parse(src: &str, input: &str) -> ParseResult {
    let grammar = compiled(src);
    Engine::new(&grammar).expect("engine").parse(input)
}

fn node(name: &str, args: Vec<Value>) -> Value {
    Value::Node {
        name: name.into(),
        args,
    }
}

fn num(v: i64) -> Value {
    node("Num", vec![Value::Int(v)])
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
fn calculator_basics() {
    let result = parse(CALC, "10 + 20");
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(result.ast, node("Add", vec![num(10), num(20)]));
    assert_eq!(result.tokens.len(), 3);
}

#[test]
fn left_recursion_is_left_associative() {
    let result = parse(CALC, "1+2+3");
    assert!(result.is_valid());
    assert_eq!(
        result.ast,
        node("Add", vec![node("Add", vec![num(1), num(2)]), num(3)])
    );
}

#[test]
fn dangling_operator_fails_at_end_of_input() {
    let result = parse(CALC, "1+");
    assert!(!result.is_valid());
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    let error = &result.errors[0];
    // "1+" is two columns wide; the failure points past it.
    assert_eq!(error.line, 1);
    assert_eq!(error.column, 3);
}

#[test]
fn skip_tokens_do_not_change_the_ast() {
    let spaced = parse(CALC, "10 + 20");
    let dense = parse(CALC, "10+20");
    assert_eq!(spaced.ast, dense.ast);
    assert!(spaced.is_valid() && dense.is_valid());
}

#[test]
fn repeated_parses_agree() {
    let grammar = compiled(CALC);
    let engine = Engine::new(&grammar).unwrap();
    let first = engine.parse("1+2+3");
    let second = engine.parse("1+2+3");
    assert_eq!(first, second);
}

#[test]
fn ordered_choice_first_match_wins() {
    let src = r#"
grammar G:
    tokens:
        A: a
        B: b
    end
    start rule R:
        | x:A -> One(x)
        | x:A y:B -> Two(x, y)
    end
end
"#;
    let result = parse(src, "ab");
    // The first alternative wins even though the second would consume more,
    // leaving the trailing token unconsumed.
    match &result.ast {
        Value::Node { name, .. } => assert_eq!(name, "One"),
        other => panic!("expected One node, got {other}"),
    }
    assert!(!result.is_valid());
}

#[test]
fn empty_match_repetition_terminates() {
    let src = r#"
grammar G:
    tokens:
        A: a
    end
    rule Opt:
        | x:A? -> Opt(x)
    end
    start rule S:
        | items:Opt* -> Items(items)
    end
end
"#;
    let result = parse(src, "");
    assert!(result.is_valid(), "{:?}", result.errors);
    // One empty iteration is kept, then the loop stops.
    assert_eq!(
        result.ast,
        node("Items", vec![Value::List(vec![node("Opt", vec![Value::Null])])])
    );
}

#[test]
fn plus_requires_one_match() {
    let src = r#"
grammar G:
    tokens:
        A: a
        WS: skip \s+
    end
    start rule S:
        | items:A+ -> Items(items)
    end
end
"#;
    assert!(!parse(src, "").is_valid());
    let two = parse(src, "a a");
    assert!(two.is_valid());
    match &two.ast {
        Value::Node { args, .. } => match &args[0] {
            Value::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other}"),
        },
        other => panic!("expected node, got {other}"),
    }
}

#[test]
fn inline_literals_synthesize_tokens() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
        WS: skip \s+
    end
    start rule Stmt:
        | "if" c:Expr "then" b:Expr -> If(c, b)
        | e:Expr -> pass
    end
    rule Expr:
        | n:NUMBER -> Num(int(n))
    end
end
"#;
    let result = parse(src, "if 1 then 2");
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(result.ast, node("If", vec![num(1), num(2)]));
}

#[test]
fn panic_mode_recovers_between_statements() {
    let src = r#"
grammar Stmts:
    tokens:
        ID: [a-z]+
        SEMI: ;
        WS: skip \s+
    end
    start rule Program:
        | s:Stmt* -> Program(s)
    end
    rule Stmt:
        | x:ID SEMI -> Stmt(x)
    end
end
"#;
    let result = parse(src, "a; b c; d;");
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    let Value::Node { name, args } = &result.ast else {
        panic!("expected Program node, got {}", result.ast);
    };
    assert_eq!(name, "Program");
    let Value::List(statements) = &args[0] else {
        panic!("expected statement list");
    };
    let good: Vec<_> = statements
        .iter()
        .filter(|s| matches!(s, Value::Node { name, .. } if name == "Stmt"))
        .collect();
    let bad: Vec<_> = statements.iter().filter(|s| s.is_error()).collect();
    assert_eq!(good.len(), 3);
    assert_eq!(bad.len(), 1);
    // The error points at the token that broke the statement.
    assert_eq!(result.errors[0].column, 6);
}

#[test]
fn no_recovery_stops_at_first_error() {
    let src = r#"
grammar Stmts:
    tokens:
        ID: [a-z]+
        SEMI: ;
        WS: skip \s+
    end
    start rule Program:
        | s:Stmt* -> Program(s)
    end
    rule Stmt:
        | x:ID SEMI -> Stmt(x)
    end
end
"#;
    let grammar = compiled(src);
    let engine = Engine::with_options(
        &grammar,
        EngineOptions {
            recovery: false,
            halt_on_lex_error: false,
        },
    )
    .unwrap();
    let result = engine.parse("a; b c; d;");
    assert!(!result.is_valid());
    assert_eq!(result.errors.len(), 1);
    // No error nodes anywhere without recovery.
    fn has_error(value: &Value) -> bool {
        match value {
            Value::Error(_) => true,
            Value::List(items) => items.iter().any(has_error),
            Value::Node { args, .. } => args.iter().any(has_error),
            _ => false,
        }
    }
    assert!(!has_error(&result.ast));
}

#[test]
fn guard_error_fails_the_alternative() {
    let src = r#"
grammar G:
    tokens:
        ID: [a-z]+
    end
    start rule Name:
        | x:ID -> Name(x) check len(x) > 5 then pass else then error('too short')
    end
end
"#;
    let ok = parse(src, "abcdef");
    assert!(ok.is_valid(), "{:?}", ok.errors);

    let short = parse(src, "abc");
    assert!(!short.is_valid());
    assert!(
        short.errors.iter().any(|e| e.message == "too short"),
        "{:?}",
        short.errors
    );
}

#[test]
fn guard_assignment_replaces_the_result() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n)) check int(n) > 5 then res = 100 else then res = 0
    end
end
"#;
    assert_eq!(parse(src, "6").ast, Value::Int(100));
    assert_eq!(parse(src, "4").ast, Value::Int(0));
}

#[test]
fn guard_without_else_keeps_value_on_false() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n)) check int(n) > 5 then res = 1
    end
end
"#;
    assert_eq!(parse(src, "3").ast, num(3));
    assert_eq!(parse(src, "9").ast, Value::Int(1));
}

#[test]
fn bare_expression_action_returns_its_value() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> int(n)
    end
end
"#;
    assert_eq!(parse(src, "42").ast, Value::Int(42));
}

#[test]
fn pass_falls_back_to_single_non_literal_term() {
    let src = r#"
grammar G:
    tokens:
        NUMBER: \d+
        WS: skip \s+
    end
    start rule E:
        | '(' Inner ')' -> pass
        | n:NUMBER -> Num(int(n))
    end
    rule Inner:
        | n:NUMBER -> Num(int(n))
    end
end
"#;
    let result = parse(src, "( 7 )");
    assert!(result.is_valid(), "{:?}", result.errors);
    assert_eq!(result.ast, num(7));
}

#[test]
fn lexer_first_match_in_order_wins() {
    let src = r#"
grammar G:
    tokens:
        AB: ab
        A: a
    end
    start rule R:
        | x:AB -> pass
        | x:A -> pass
    end
end
"#;
    let result = parse(src, "ab");
    assert!(result.is_valid());
    match &result.ast {
        Value::Token(token) => assert_eq!(token.name(), "AB"),
        other => panic!("expected token, got {other}"),
    }
}

#[test]
fn unlexable_input_produces_error_token_and_error() {
    let result = parse(CALC, "1 $ 2");
    assert!(!result.is_valid());
    assert!(result
        .tokens
        .iter()
        .any(|t| t.name() == ERROR_TOKEN && t.text() == "$"));
    assert!(result.errors.iter().any(|e| e.message.contains("unexpected character")));
}

#[test]
fn halt_on_lex_error_stops_before_parsing() {
    let grammar = compiled(CALC);
    let engine = Engine::with_options(
        &grammar,
        EngineOptions {
            recovery: true,
            halt_on_lex_error: true,
        },
    )
    .unwrap();
    let result = engine.parse("1 $ 2");
    assert!(!result.is_valid());
    assert_eq!(result.ast, Value::Null);
}

#[test]
fn parse_rule_targets_any_rule() {
    let grammar = compiled(CALC);
    let engine = Engine::new(&grammar).unwrap();
    let result = engine.parse_rule("Term", "5").unwrap();
    assert!(result.is_valid());
    assert_eq!(result.ast, num(5));

    assert!(engine.parse_rule("Nope", "5").is_err());
}

#[test]
fn indirect_left_recursion_fails_instead_of_looping() {
    let src = r#"
grammar G:
    tokens:
        X: x
    end
    start rule A:
        | b:B -> pass
    end
    rule B:
        | a:A y:X -> Pair(a, y)
    end
end
"#;
    // Must terminate; the seedless marker turns the cycle into a failure.
    let result = parse(src, "x");
    assert!(!result.is_valid());
}

#[test]
fn bindings_are_scoped_per_alternative() {
    let src = r#"
grammar G:
    tokens:
        A: a
        B: b
    end
    start rule R:
        | x:A -> One(x)
        | x:B -> Two(x)
    end
end
"#;
    let result = parse(src, "b");
    assert!(result.is_valid());
    match &result.ast {
        Value::Node { name, args } => {
            assert_eq!(name, "Two");
            match &args[0] {
                Value::Token(token) => assert_eq!(token.text(), "b"),
                other => panic!("expected token, got {other}"),
            }
        }
        other => panic!("expected node, got {other}"),
    }
}

#[test]
fn optional_yields_null_marker() {
    let src = r#"
grammar G:
    tokens:
        A: a
        B: b
    end
    start rule R:
        | x:A? y:B -> Pair(x, y)
    end
end
"#;
    let with = parse(src, "ab");
    assert!(with.is_valid());
    let without = parse(src, "b");
    assert!(without.is_valid());
    match &without.ast {
        Value::Node { args, .. } => assert_eq!(args[0], Value::Null),
        other => panic!("expected node, got {other}"),
    }
}
