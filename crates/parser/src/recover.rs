//! Block-level recovery for malformed `.apy` sources.
//!
//! When the whole-file parse fails, the source is segmented along its
//! top-level keywords (`grammar`, `tokens:`, `rule`, `test`, their closing
//! `end` lines) and every segment is parsed in isolation. Each broken
//! segment contributes one error; the intact ones still build model parts.

use crate::{
    ApyParser, FromPair, Grammar, GrammarRule, Rule, SourceParse, SyntaxError, TestSuite,
    TokenDecl,
};
use pest::Parser as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Tokens,
    Rules,
    Tests,
}

#[derive(Debug)]
struct Section {
    kind: SectionKind,
    /// 1-based line of the section keyword.
    start_line: usize,
    /// Byte range covering the section through its `end` line.
    range: std::ops::Range<usize>,
}

#[derive(Debug)]
struct Chunk {
    /// None when the `grammar` header itself failed to parse.
    name: Option<String>,
    header_line: usize,
    sections: Vec<Section>,
}

/// First identifier-shaped word of a line, ignoring indentation.
fn leading_word(line: &str) -> &str {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// True for a line that is just `end` (comments allowed after it).
fn is_end_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix("end") else {
        return false;
    };
    if rest
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return false;
    }
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with('#')
}

fn section_kind(word: &str) -> Option<SectionKind> {
    match word {
        "tokens" => Some(SectionKind::Tokens),
        "rule" | "start" => Some(SectionKind::Rules),
        "test" => Some(SectionKind::Tests),
        _ => None,
    }
}

/// Split the source into grammar chunks and their sections.
fn scan(text: &str, errors: &mut Vec<SyntaxError>) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Option<Chunk> = None;
    let mut open_section: Option<(SectionKind, usize, usize)> = None;
    let mut garbage_reported = false;

    let mut offset = 0usize;
    for (idx, raw_line) in text.split_inclusive('\n').enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let line_len = raw_line.len();
        let stripped = line.trim_start();
        let is_blank = stripped.is_empty() || stripped.starts_with('#');

        if let Some((kind, start_line, start)) = open_section {
            if is_end_line(line) {
                let chunk = current.as_mut().expect("section outside grammar");
                chunk.sections.push(Section {
                    kind,
                    start_line,
                    range: start..offset + line_len,
                });
                open_section = None;
            }
        } else if let Some(chunk) = current.as_mut() {
            if is_blank {
                // spacer
            } else if is_end_line(line) {
                chunks.push(current.take().expect("closing a grammar"));
            } else if let Some(kind) = section_kind(leading_word(line)) {
                open_section = Some((kind, line_no, offset));
            } else if leading_word(line) == "grammar" {
                errors.push(SyntaxError::new(
                    chunk.header_line,
                    1,
                    format!(
                        "grammar '{}' is missing its closing 'end'",
                        chunk.name.as_deref().unwrap_or("<unnamed>")
                    ),
                ));
                chunks.push(current.take().expect("closing a grammar"));
                current = Some(open_chunk(line, line_no, errors));
            } else {
                errors.push(SyntaxError::new(
                    line_no,
                    1,
                    format!("expected 'tokens:', 'rule', 'test', or 'end', found: {stripped}"),
                ));
            }
        } else if !is_blank {
            if leading_word(line) == "grammar" {
                current = Some(open_chunk(line, line_no, errors));
                garbage_reported = false;
            } else if !garbage_reported {
                errors.push(SyntaxError::new(
                    line_no,
                    1,
                    "expected 'grammar <Name>:' at top level",
                ));
                garbage_reported = true;
            }
        }

        offset += line_len;
    }

    if let Some((_, start_line, _)) = open_section {
        errors.push(SyntaxError::new(
            start_line,
            1,
            "block is missing its closing 'end'",
        ));
    }
    if let Some(chunk) = current.take() {
        errors.push(SyntaxError::new(
            chunk.header_line,
            1,
            format!(
                "grammar '{}' is missing its closing 'end'",
                chunk.name.as_deref().unwrap_or("<unnamed>")
            ),
        ));
        chunks.push(chunk);
    }
    chunks
}

fn open_chunk(header: &str, line_no: usize, errors: &mut Vec<SyntaxError>) -> Chunk {
    match ApyParser::parse(Rule::header_seg, header) {
        Ok(mut pairs) => {
            let seg = pairs.next().expect("header pair");
            let name = seg
                .into_inner()
                .find(|p| p.as_rule() == Rule::ident)
                .expect("grammar header without name")
                .as_str()
                .to_string();
            Chunk {
                name: Some(name),
                header_line: line_no,
                sections: Vec::new(),
            }
        }
        Err(err) => {
            errors.push(SyntaxError::from_pest(&err, line_no - 1));
            Chunk {
                name: None,
                header_line: line_no,
                sections: Vec::new(),
            }
        }
    }
}

pub(crate) fn parse_segmented(text: &str) -> SourceParse {
    let mut errors = Vec::new();
    let chunks = scan(text, &mut errors);
    let mut grammars = Vec::new();

    for chunk in chunks {
        let mut tokens: Vec<TokenDecl> = Vec::new();
        let mut rules: Vec<GrammarRule> = Vec::new();
        let mut suites: Vec<TestSuite> = Vec::new();

        for section in &chunk.sections {
            let segment = &text[section.range.clone()];
            let line_offset = section.start_line - 1;
            match section.kind {
                SectionKind::Tokens => match ApyParser::parse(Rule::tokens_seg, segment) {
                    Ok(mut pairs) => {
                        let block = pairs
                            .next()
                            .expect("tokens segment pair")
                            .into_inner()
                            .find(|p| p.as_rule() == Rule::tokens_block)
                            .expect("tokens segment without block");
                        for line in block
                            .into_inner()
                            .filter(|p| p.as_rule() == Rule::token_line)
                        {
                            let mut decl = TokenDecl::from_pair(line);
                            decl.offset_line(line_offset);
                            tokens.push(decl);
                        }
                    }
                    Err(err) => errors.push(SyntaxError::from_pest(&err, line_offset)),
                },
                SectionKind::Rules => match ApyParser::parse(Rule::rule_seg, segment) {
                    Ok(mut pairs) => {
                        let block = pairs
                            .next()
                            .expect("rule segment pair")
                            .into_inner()
                            .find(|p| p.as_rule() == Rule::rule_block)
                            .expect("rule segment without block");
                        let mut rule = GrammarRule::from_pair(block);
                        rule.offset_line(line_offset);
                        rules.push(rule);
                    }
                    Err(err) => errors.push(SyntaxError::from_pest(&err, line_offset)),
                },
                SectionKind::Tests => match ApyParser::parse(Rule::test_seg, segment) {
                    Ok(mut pairs) => {
                        let block = pairs
                            .next()
                            .expect("test segment pair")
                            .into_inner()
                            .find(|p| p.as_rule() == Rule::test_block)
                            .expect("test segment without block");
                        let mut suite = TestSuite::from_pair(block);
                        suite.offset_lines(line_offset);
                        suites.push(suite);
                    }
                    Err(err) => errors.push(SyntaxError::from_pest(&err, line_offset)),
                },
            }
        }

        if let Some(name) = chunk.name {
            // Section items already carry absolute lines.
            grammars.push(Grammar::new(name, tokens, rules, suites, chunk.header_line));
        }
    }

    SourceParse::new(grammars, errors)
}
