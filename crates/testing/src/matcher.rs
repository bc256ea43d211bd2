//! Structural matching of parse values against `Yields` patterns.

use engine::Value;
use parser::Pattern;

/// Does `value` match `pattern`?
///
/// Constructor patterns require name equality and argument-count equality
/// unless the pattern is open (ended with `...`), in which case extra
/// arguments are ignored. String patterns match string values and token
/// text; numeric and boolean leaves match by value.
#[must_use]
pub fn pattern_matches(value: &Value, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Wildcard => true,
        Pattern::Null => matches!(value, Value::Null),
        Pattern::Bool(expected) => matches!(value, Value::Bool(b) if b == expected),
        Pattern::Int(expected) => match value {
            Value::Int(v) => v == expected,
            Value::Float(v) => *v == *expected as f64,
            _ => false,
        },
        Pattern::Float(expected) => match value {
            Value::Float(v) => v == expected,
            Value::Int(v) => *v as f64 == *expected,
            _ => false,
        },
        Pattern::Str(expected) => match value {
            Value::Str(s) => s == expected,
            Value::Token(token) => token.text() == expected,
            _ => false,
        },
        Pattern::Node { name, args, open } => {
            let Value::Node {
                name: value_name,
                args: value_args,
            } = value
            else {
                return false;
            };
            if value_name != name {
                return false;
            }
            if *open {
                if value_args.len() < args.len() {
                    return false;
                }
            } else if value_args.len() != args.len() {
                return false;
            }
            args.iter()
                .zip(value_args)
                .all(|(p, v)| pattern_matches(v, p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Token;

    fn node(name: &str, args: Vec<Value>) -> Value {
        Value::Node {
            name: name.into(),
            args,
        }
    }

    fn pat_node(name: &str, args: Vec<Pattern>, open: bool) -> Pattern {
        Pattern::Node {
            name: name.into(),
            args,
            open,
        }
    }

    #[test]
    fn exact_node_match() {
        let value = node("Add", vec![Value::Int(1), Value::Int(2)]);
        let pattern = pat_node("Add", vec![Pattern::Int(1), Pattern::Int(2)], false);
        assert!(pattern_matches(&value, &pattern));

        let wrong_name = pat_node("Sub", vec![Pattern::Int(1), Pattern::Int(2)], false);
        assert!(!pattern_matches(&value, &wrong_name));

        let wrong_arity = pat_node("Add", vec![Pattern::Int(1)], false);
        assert!(!pattern_matches(&value, &wrong_arity));
    }

    #[test]
    fn open_node_ignores_remaining_args() {
        let value = node("Add", vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(pattern_matches(&value, &pat_node("Add", vec![], true)));
        assert!(pattern_matches(
            &value,
            &pat_node("Add", vec![Pattern::Int(1)], true)
        ));
        assert!(!pattern_matches(
            &value,
            &pat_node("Add", vec![Pattern::Int(9)], true)
        ));
    }

    #[test]
    fn string_pattern_matches_token_text() {
        let token = Value::Token(Token::new("ID", "foo", 1, 1));
        assert!(pattern_matches(&token, &Pattern::Str("foo".into())));
        assert!(!pattern_matches(&token, &Pattern::Str("bar".into())));
    }

    #[test]
    fn wildcard_matches_anything() {
        assert!(pattern_matches(&Value::Null, &Pattern::Wildcard));
        assert!(pattern_matches(
            &node("X", vec![]),
            &Pattern::Wildcard
        ));
    }

    #[test]
    fn numeric_leaves_cross_match() {
        assert!(pattern_matches(&Value::Float(2.0), &Pattern::Int(2)));
        assert!(pattern_matches(&Value::Int(2), &Pattern::Float(2.0)));
        assert!(!pattern_matches(&Value::Int(2), &Pattern::Int(3)));
    }
}
