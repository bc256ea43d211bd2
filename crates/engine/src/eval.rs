//! Evaluation of whitelisted action/guard fragments over a binding scope.

use crate::value::Value;
use parser::fragment::{BinOp, CmpOp};
use parser::{Expr, Field};
use std::collections::HashMap;

/// An evaluation failure; surfaces as a (custom) parse failure of the
/// alternative being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError(pub String);

type EvalResult = Result<Value, EvalError>;

fn err(message: impl Into<String>) -> EvalError {
    EvalError(message.into())
}

/// Raw text of a value for coercions: token text unquoted, everything else
/// its display form.
fn text_of(value: &Value) -> String {
    match value {
        Value::Token(token) => token.text().to_string(),
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_int(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => Ok(*v as i64),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Token(_) | Value::Str(_) => {
            let text = text_of(value);
            text.trim()
                .parse()
                .map_err(|_| err(format!("cannot convert {text:?} to int")))
        }
        other => Err(err(format!("cannot convert {other} to int"))),
    }
}

fn to_float(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        Value::Token(_) | Value::Str(_) => {
            let text = text_of(value);
            text.trim()
                .parse()
                .map_err(|_| err(format!("cannot convert {text:?} to float")))
        }
        other => Err(err(format!("cannot convert {other} to float"))),
    }
}

fn length_of(value: &Value) -> Result<i64, EvalError> {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::Token(token) => token.text().chars().count(),
        Value::List(items) => items.len(),
        Value::Node { args, .. } => args.len(),
        other => return Err(err(format!("{other} has no length"))),
    };
    Ok(len as i64)
}

fn call_builtin(func: &str, arg: &Value) -> EvalResult {
    match func {
        "int" => to_int(arg).map(Value::Int),
        "float" => to_float(arg).map(Value::Float),
        "str" => Ok(Value::Str(text_of(arg))),
        "len" => length_of(arg).map(Value::Int),
        other => Err(err(format!("unknown function '{other}'"))),
    }
}

fn numeric_pair(lhs: &Value, rhs: &Value) -> Option<(f64, f64, bool)> {
    let as_num = |v: &Value| match v {
        Value::Int(x) => Some((*x as f64, true)),
        Value::Float(x) => Some((*x, false)),
        _ => None,
    };
    let (l, l_int) = as_num(lhs)?;
    let (r, r_int) = as_num(rhs)?;
    Some((l, r, l_int && r_int))
}

fn apply_binary(op: BinOp, lhs: &Value, rhs: &Value) -> EvalResult {
    if op == BinOp::Add {
        // String concatenation, with tokens coerced to their text.
        match (lhs, rhs) {
            (Value::Str(_) | Value::Token(_), _) | (_, Value::Str(_) | Value::Token(_)) => {
                return Ok(Value::Str(format!("{}{}", text_of(lhs), text_of(rhs))));
            }
            _ => {}
        }
    }
    let Some((l, r, both_int)) = numeric_pair(lhs, rhs) else {
        return Err(err(format!("cannot apply arithmetic to {lhs} and {rhs}")));
    };
    if matches!(op, BinOp::Div | BinOp::Rem) && r == 0.0 {
        return Err(err("division by zero"));
    }
    let result = match op {
        BinOp::Add => l + r,
        BinOp::Sub => l - r,
        BinOp::Mul => l * r,
        BinOp::Div => l / r,
        BinOp::Rem => l % r,
    };
    if both_int {
        Ok(Value::Int(match op {
            // Integer division truncates.
            BinOp::Div => (l as i64) / (r as i64),
            BinOp::Rem => (l as i64) % (r as i64),
            _ => result as i64,
        }))
    } else {
        Ok(Value::Float(result))
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Token(t), Value::Str(s)) | (Value::Str(s), Value::Token(t)) => t.text() == s,
        (Value::Int(l), Value::Float(r)) | (Value::Float(r), Value::Int(l)) => *l as f64 == *r,
        _ => lhs == rhs,
    }
}

fn apply_compare(op: CmpOp, lhs: &Value, rhs: &Value) -> EvalResult {
    let outcome = match op {
        CmpOp::Eq => values_equal(lhs, rhs),
        CmpOp::Ne => !values_equal(lhs, rhs),
        ordered => {
            if let Some((l, r, _)) = numeric_pair(lhs, rhs) {
                match ordered {
                    CmpOp::Lt => l < r,
                    CmpOp::Le => l <= r,
                    CmpOp::Gt => l > r,
                    CmpOp::Ge => l >= r,
                    CmpOp::Eq | CmpOp::Ne => unreachable!(),
                }
            } else {
                let (l, r) = (text_of(lhs), text_of(rhs));
                match ordered {
                    CmpOp::Lt => l < r,
                    CmpOp::Le => l <= r,
                    CmpOp::Gt => l > r,
                    CmpOp::Ge => l >= r,
                    CmpOp::Eq | CmpOp::Ne => unreachable!(),
                }
            }
        }
    };
    Ok(Value::Bool(outcome))
}

/// Evaluate a fragment expression in a binding scope.
pub fn eval_expr(expr: &Expr, scope: &HashMap<String, Value>) -> EvalResult {
    match expr {
        Expr::Ident(name) => scope
            .get(name)
            .cloned()
            .ok_or_else(|| err(format!("unbound name '{name}'"))),
        Expr::FieldAccess { base, field } => {
            let value = scope
                .get(base)
                .ok_or_else(|| err(format!("unbound name '{base}'")))?;
            let Value::Token(token) = value else {
                return Err(err(format!("'{base}' is not a token; cannot read .{field}")));
            };
            match Field::from_name(field) {
                Some(Field::Value) => Ok(Value::Str(token.text().to_string())),
                Some(Field::Line) => Ok(Value::Int(token.line() as i64)),
                Some(Field::Column) => Ok(Value::Int(token.column() as i64)),
                None => Err(err(format!("unknown token field '.{field}'"))),
            }
        }
        Expr::Int(v) => Ok(Value::Int(*v)),
        Expr::Float(v) => Ok(Value::Float(*v)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Call { func, arg } => {
            let arg = eval_expr(arg, scope)?;
            call_builtin(func, &arg)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, scope)?;
            let rhs = eval_expr(rhs, scope)?;
            apply_binary(*op, &lhs, &rhs)
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, scope)?;
            let rhs = eval_expr(rhs, scope)?;
            apply_compare(*op, &lhs, &rhs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Token;

    fn scope(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.into())
    }

    #[test]
    fn int_of_token_text() {
        let s = scope(&[("n", Value::Token(Token::new("NUMBER", "42", 1, 1)))]);
        let expr = Expr::Call {
            func: "int".into(),
            arg: Box::new(ident("n")),
        };
        assert_eq!(eval_expr(&expr, &s), Ok(Value::Int(42)));
    }

    #[test]
    fn field_access_on_token() {
        let s = scope(&[("n", Value::Token(Token::new("NUMBER", "42", 3, 7)))]);
        let value = Expr::FieldAccess {
            base: "n".into(),
            field: "value".into(),
        };
        assert_eq!(eval_expr(&value, &s), Ok(Value::Str("42".into())));
        let line = Expr::FieldAccess {
            base: "n".into(),
            field: "line".into(),
        };
        assert_eq!(eval_expr(&line, &s), Ok(Value::Int(3)));
    }

    #[test]
    fn comparison_with_token_coercion() {
        let s = scope(&[("x", Value::Token(Token::new("ID", "foo", 1, 1)))]);
        let expr = Expr::Compare {
            op: CmpOp::Eq,
            lhs: Box::new(ident("x")),
            rhs: Box::new(Expr::Str("foo".into())),
        };
        assert_eq!(eval_expr(&expr, &s), Ok(Value::Bool(true)));
    }

    #[test]
    fn arithmetic_int_and_float() {
        let s = HashMap::new();
        let sum = Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Int(2)),
            rhs: Box::new(Expr::Int(3)),
        };
        assert_eq!(eval_expr(&sum, &s), Ok(Value::Int(5)));

        let mixed = Expr::Binary {
            op: BinOp::Mul,
            lhs: Box::new(Expr::Int(2)),
            rhs: Box::new(Expr::Float(1.5)),
        };
        assert_eq!(eval_expr(&mixed, &s), Ok(Value::Float(3.0)));
    }

    #[test]
    fn division_by_zero_fails() {
        let s = HashMap::new();
        let expr = Expr::Binary {
            op: BinOp::Div,
            lhs: Box::new(Expr::Int(1)),
            rhs: Box::new(Expr::Int(0)),
        };
        assert!(eval_expr(&expr, &s).is_err());
    }

    #[test]
    fn len_of_list_and_string() {
        let s = scope(&[
            ("xs", Value::List(vec![Value::Int(1), Value::Int(2)])),
            ("t", Value::Str("abc".into())),
        ]);
        let len = |name: &str| Expr::Call {
            func: "len".into(),
            arg: Box::new(ident(name)),
        };
        assert_eq!(eval_expr(&len("xs"), &s), Ok(Value::Int(2)));
        assert_eq!(eval_expr(&len("t"), &s), Ok(Value::Int(3)));
    }
}
