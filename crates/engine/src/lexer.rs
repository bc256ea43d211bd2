//! The lexer driver: ordered, anchored, first-match-wins.

use crate::result::ParseError;
use crate::value::Token;
use crate::{Engine, ERROR_TOKEN};

/// Lexed input: the parser-visible token stream (skip tokens omitted), lex
/// errors, and the source position just past the last character.
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
    pub end: (usize, usize),
}

fn advance(line: &mut usize, column: &mut usize, text: &str) {
    for c in text.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}

/// Tokenize `input` against the engine's token table.
///
/// At each position the patterns are tried in table order and the first
/// match wins; PEG ordering governs, there is no longest-match rule. An
/// unmatched character yields one `ERROR` token plus a recorded error, so
/// the parser has something to resynchronize over.
pub fn lex(engine: &Engine, input: &str) -> Lexed {
    let specs = engine.grammar.tokens();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let mut pos = 0;
    let mut line = 1;
    let mut column = 1;

    'outer: while pos < input.len() {
        for (spec, regex) in specs.iter().zip(&engine.regexes) {
            let Some(found) = regex.find(&input[pos..]) else {
                continue;
            };
            if found.end() == 0 {
                errors.push(ParseError::new(
                    format!(
                        "token {} matched zero characters; patterns must consume input",
                        spec.name()
                    ),
                    line,
                    column,
                ));
                break 'outer;
            }
            let text = &input[pos..pos + found.end()];
            if !spec.is_skip() {
                tokens.push(Token::new(spec.name(), text, line, column));
            }
            advance(&mut line, &mut column, text);
            pos += found.end();
            continue 'outer;
        }

        // Nothing matched: emit a one-character error token and move on.
        let c = input[pos..].chars().next().expect("position inside input");
        errors.push(ParseError::new(
            format!("unexpected character {c:?}"),
            line,
            column,
        ));
        tokens.push(Token::new(ERROR_TOKEN, c.to_string(), line, column));
        advance(&mut line, &mut column, &input[pos..pos + c.len_utf8()]);
        pos += c.len_utf8();
        if engine.options.halt_on_lex_error {
            break;
        }
    }

    Lexed {
        tokens,
        errors,
        end: (line, column),
    }
}
