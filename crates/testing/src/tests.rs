use crate::run_grammar_tests;
use analyzer::analyze;
use engine::EngineOptions;
use parser::parse_str;

fn run(src: &str) -> bool {
    let parsed = parse_str(src);
    assert!(parsed.is_clean(), "{:?}", parsed.errors());
    let grammar = &parsed.grammars()[0];
    let analysis = analyze(grammar);
    assert!(!analysis.has_errors(), "{:?}", analysis.diagnostics());
    let compiled = analysis.compiled().unwrap();
    run_grammar_tests(grammar, compiled, EngineOptions::default()).expect("engine builds")
}

#[test]
fn calculator_suite_passes() {
    assert!(run(r#"
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
        "1+2+3" => Yields(Add(Add(Num(1), Num(2)), Num(3)))
        "7" => Success
        "1+" => Fail
    end
end
"#));
}

#[test]
fn failing_expectation_fails_the_run() {
    assert!(!run(r#"
grammar Calc:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n))
    end
    test Wrong:
        "5" => Yields(Num(6))
    end
end
"#));
}

#[test]
fn unexpected_success_fails_a_fail_case() {
    assert!(!run(r#"
grammar Calc:
    tokens:
        NUMBER: \d+
    end
    start rule E:
        | n:NUMBER -> Num(int(n))
    end
    test Wrong:
        "5" => Fail
    end
end
"#));
}

#[test]
fn unconsumed_input_is_a_failure() {
    assert!(run(r#"
grammar Calc:
    tokens:
        NUMBER: \d+
        WS: skip \s+
    end
    start rule E:
        | n:NUMBER -> Num(int(n))
    end
    test Eof:
        "5 5" => Fail
        "5" => Success
    end
end
"#));
}

#[test]
fn suite_can_target_inner_rule() {
    assert!(run(r#"
grammar G:
    tokens:
        NUMBER: \d+
        PLUS: \+
    end
    start rule E:
        | l:T PLUS r:T -> Add(l, r)
    end
    rule T:
        | n:NUMBER -> Num(int(n))
    end
    test Terms T:
        "8" => Yields(Num(8))
    end
end
"#));
}

#[test]
fn wildcard_expectations() {
    assert!(run(r#"
grammar G:
    tokens:
        NUMBER: \d+
        PLUS: \+
    end
    start rule E:
        | l:T PLUS r:T -> Add(l, r)
        | t:T -> pass
    end
    rule T:
        | n:NUMBER -> Num(int(n))
    end
    test Shapes:
        "1+2" => Yields(Add(...))
        "1+2" => Yields(Add(Num(1), ...))
        "3" => Yields(...)
    end
end
"#));
}

#[test]
fn token_text_matches_single_quoted_pattern() {
    assert!(run(r#"
grammar G:
    tokens:
        ID: [a-z]+
    end
    start rule R:
        | x:ID -> Name(x)
    end
    test Text:
        "hello" => Yields(Name('hello'))
    end
end
"#));
}

#[test]
fn guard_driven_expectations() {
    assert!(run(r#"
grammar G:
    tokens:
        ID: [a-z]+
    end
    start rule R:
        | x:ID -> Name(x) check len(x) > 5 then pass else then error('too short')
    end
    test Guards:
        "abcdef" => Success
        "abc" => Fail
    end
end
"#));
}

#[test]
fn guard_can_replace_the_result_value() {
    assert!(run(r#"
grammar G:
    tokens:
        NUMBER: \d+
    end
    start rule Expr:
        | n:NUMBER -> int(n) check int(n.value) > 5 then res = 100 else then res = 0
    end
    test Expr:
        "6" => Yields(100)
        "4" => Yields(0)
    end
end
"#));
}

#[test]
fn grammar_without_suites_passes_trivially() {
    assert!(run(r#"
grammar G:
    tokens:
        ID: [a-z]+
    end
    start rule R:
        | x:ID -> Name(x)
    end
end
"#));
}
