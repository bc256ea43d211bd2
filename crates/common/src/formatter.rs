//! Unified reporting for grammar-embedded test runs.

use tracing::{error, info};

/// Tallies test case outcomes across the suites of one grammar.
pub struct SuiteReport {
    grammar_name: String,
    total: usize,
    failed: usize,
}

impl SuiteReport {
    pub fn new(grammar_name: &str) -> Self {
        info!("Running integrated tests for grammar: {grammar_name}");
        Self {
            grammar_name: grammar_name.to_string(),
            total: 0,
            failed: 0,
        }
    }

    pub fn begin_suite(&self, suite_name: &str, rule_name: &str) {
        info!("Test suite '{suite_name}' (rule {rule_name})");
    }

    pub fn case_passed(&mut self, input: &str, detail: &str) {
        self.total += 1;
        info!("  ok   {input:?} => {detail}");
    }

    pub fn case_failed(&mut self, input: &str, detail: &str) {
        self.total += 1;
        self.failed += 1;
        error!("  FAIL {input:?} => {detail}");
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Log the summary line and report overall success.
    pub fn finish(self) -> bool {
        if self.failed > 0 {
            error!(
                "{}: tests failed: {}/{}",
                self.grammar_name, self.failed, self.total
            );
            false
        } else {
            info!("{}: all {} tests passed", self.grammar_name, self.total);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tallies_and_outcome() {
        let mut report = SuiteReport::new("Calc");
        report.case_passed("1+1", "Success");
        report.case_passed("2", "Yields match");
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed(), 0);
        assert!(report.finish());

        let mut report = SuiteReport::new("Calc");
        report.case_passed("1", "Success");
        report.case_failed("1+", "expected Fail but parse succeeded");
        assert_eq!(report.failed(), 1);
        assert!(!report.finish());
    }
}
