//! The suite runner.

use crate::matcher::pattern_matches;
use analyzer::CompiledGrammar;
use common::SuiteReport;
use engine::{Engine, EngineError, EngineOptions};
use parser::{Expectation, Grammar};
use tracing::warn;

/// Run every embedded suite of `grammar` against the compiled image.
///
/// Returns whether all cases passed. Grammars without suites pass
/// trivially, with a nudge to add some.
pub fn run_grammar_tests(
    grammar: &Grammar,
    compiled: &CompiledGrammar,
    options: EngineOptions,
) -> Result<bool, EngineError> {
    if grammar.suites().is_empty() {
        warn!(
            "no tests defined for grammar '{}'; skipping verification",
            grammar.name()
        );
        return Ok(true);
    }

    let engine = Engine::with_options(compiled, options)?;
    let default_rule = compiled.rule(compiled.start()).name();
    let mut report = SuiteReport::new(grammar.name());

    for suite in grammar.suites() {
        let rule_name = suite.target_rule().unwrap_or(default_rule);
        report.begin_suite(suite.name(), rule_name);

        for case in suite.cases() {
            let result = match engine.parse_rule(rule_name, case.input()) {
                Ok(result) => result,
                Err(err) => {
                    report.case_failed(case.input(), &format!("{err}"));
                    continue;
                }
            };

            match case.expectation() {
                Expectation::Success => {
                    if result.is_valid() {
                        report.case_passed(case.input(), "Success");
                    } else {
                        report.case_failed(
                            case.input(),
                            &format!("expected Success, got: {}", result.errors[0]),
                        );
                    }
                }
                Expectation::Fail => {
                    if result.is_valid() {
                        report.case_failed(case.input(), "expected Fail but the parse succeeded");
                    } else {
                        report.case_passed(case.input(), "Fail (as expected)");
                    }
                }
                Expectation::Yields(pattern) => {
                    if !result.is_valid() {
                        report.case_failed(
                            case.input(),
                            &format!(
                                "expected Yields({pattern}), got error: {}",
                                result.errors[0]
                            ),
                        );
                    } else if pattern_matches(&result.ast, pattern) {
                        report.case_passed(case.input(), "Yields match");
                    } else {
                        report.case_failed(
                            case.input(),
                            &format!("expected Yields({pattern}), got {}", result.ast),
                        );
                    }
                }
            }
        }
    }

    Ok(report.finish())
}
