//! The grammar model root and the source-level parse entry point.

use crate::recover;
use crate::{
    ApyParser, FromPair, GrammarRule, Rule, SourceParse, TestSuite, TokenDecl,
};
use pest::iterators::Pair;
use pest::Parser as _;
use std::fmt;
use tracing::debug;

/// A complete grammar: token table, rules, and embedded test suites.
///
/// Immutable once the front-end finishes; the semantic checker annotates a
/// compiled image instead of mutating this model.
#[derive(Debug, Clone, PartialEq)]
pub struct Grammar {
    name: String,
    tokens: Vec<TokenDecl>,
    rules: Vec<GrammarRule>,
    suites: Vec<TestSuite>,
    line: usize,
}

impl Grammar {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        tokens: Vec<TokenDecl>,
        rules: Vec<GrammarRule>,
        suites: Vec<TestSuite>,
        line: usize,
    ) -> Self {
        Self {
            name: name.into(),
            tokens,
            rules,
            suites,
            line,
        }
    }

    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    #[inline]
    pub fn tokens(&self) -> &[TokenDecl] {
        &self.tokens
    }

    #[must_use]
    #[inline]
    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    #[must_use]
    #[inline]
    pub fn suites(&self) -> &[TestSuite] {
        &self.suites
    }

    #[must_use]
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Rule lookup by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&GrammarRule> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// The explicitly marked start rule, if any.
    #[must_use]
    pub fn explicit_start(&self) -> Option<&GrammarRule> {
        self.rules.iter().find(|r| r.is_start())
    }

    /// The effective start rule: the marked one, or the first declared.
    #[must_use]
    pub fn start_rule(&self) -> Option<&GrammarRule> {
        self.explicit_start().or_else(|| self.rules.first())
    }

}

fn write_indented(f: &mut fmt::Formatter<'_>, block: &str) -> fmt::Result {
    for line in block.lines() {
        if line.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, "    {line}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grammar {}:", self.name)?;
        if !self.tokens.is_empty() {
            writeln!(f, "    tokens:")?;
            for token in &self.tokens {
                writeln!(f, "        {token}")?;
            }
            writeln!(f, "    end")?;
        }
        for rule in &self.rules {
            writeln!(f)?;
            write_indented(f, &rule.to_string())?;
        }
        for suite in &self.suites {
            writeln!(f)?;
            write_indented(f, &suite.to_string())?;
        }
        write!(f, "end")
    }
}

impl FromPair for Grammar {
    fn from_pair(pair: Pair<Rule>) -> Self {
        debug_assert_eq!(pair.as_rule(), Rule::grammar_def);
        let line = pair.as_span().start_pos().line_col().0;
        let mut name = String::new();
        let mut tokens = Vec::new();
        let mut rules = Vec::new();
        let mut suites = Vec::new();
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::ident => name = part.as_str().to_string(),
                Rule::tokens_block => {
                    tokens.extend(
                        part.into_inner()
                            .filter(|p| p.as_rule() == Rule::token_line)
                            .map(TokenDecl::from_pair),
                    );
                }
                Rule::rule_block => rules.push(GrammarRule::from_pair(part)),
                Rule::test_block => suites.push(TestSuite::from_pair(part)),
                // Keyword pairs carry no content.
                _ => {}
            }
        }
        Self {
            name,
            tokens,
            rules,
            suites,
            line,
        }
    }
}

/// Parse `.apy` source text into grammars.
///
/// A syntactically clean file parses in one pass. Otherwise the source is
/// re-scanned block by block so that every broken construct yields its own
/// [`crate::SyntaxError`] and the intact blocks still produce a model.
pub fn parse_str(text: &str) -> SourceParse {
    match ApyParser::parse(Rule::file, text) {
        Ok(mut pairs) => {
            let file = pairs.next().expect("file pair");
            let grammars = file
                .into_inner()
                .filter(|p| p.as_rule() == Rule::grammar_def)
                .map(Grammar::from_pair)
                .collect();
            SourceParse::new(grammars, Vec::new())
        }
        Err(err) => {
            debug!("whole-file parse failed, re-parsing by block: {err}");
            recover::parse_segmented(text)
        }
    }
}
