/// Runtime support for the generated parser.
///
/// This module is emitted verbatim by the generator; the static grammar
/// image elsewhere in this file parameterizes it. It implements the full
/// parse-time semantics: an ordered first-match-wins lexer, a packrat
/// parser with seed-growing for direct left recursion, semantic actions
/// and guards, and panic-mode error recovery.
pub mod runtime {
    #![allow(dead_code)]

    use regex::Regex;
    use std::collections::HashMap;
    use std::fmt;

    /// Name of the synthetic token produced for unlexable input.
    pub const ERROR_TOKEN: &str = "ERROR";

    // ------------------------------------------------------------------
    // Static grammar image
    // ------------------------------------------------------------------

    pub struct Grammar {
        pub name: &'static str,
        pub tokens: &'static [TokenSpec],
        pub rules: &'static [Rule],
        pub start: usize,
    }

    impl Grammar {
        pub fn rule_id(&self, name: &str) -> Option<usize> {
            self.rules.iter().position(|r| r.name == name)
        }
    }

    pub struct TokenSpec {
        pub name: &'static str,
        pub pattern: &'static str,
        pub skip: bool,
        pub synthetic: bool,
    }

    pub struct Rule {
        pub name: &'static str,
        pub alternatives: &'static [Alt],
        pub left_recursive: bool,
        /// Sorted synchronization token names for panic-mode recovery.
        pub sync: &'static [&'static str],
    }

    pub struct Alt {
        pub terms: &'static [Term],
        pub action: Action,
        pub guard: Option<Guard>,
    }

    pub struct Term {
        pub binding: Option<&'static str>,
        pub matcher: Matcher,
        pub quantifier: Option<Quant>,
        pub from_literal: bool,
    }

    #[derive(Clone, Copy)]
    pub enum Matcher {
        Rule(usize),
        Token(usize),
    }

    #[derive(Clone, Copy)]
    pub enum Quant {
        Optional,
        Star,
        Plus,
    }

    pub enum Action {
        Pass,
        Construct {
            name: &'static str,
            args: &'static [Expr],
        },
        Value(Expr),
    }

    pub struct Guard {
        pub condition: Expr,
        pub then_branch: Stmt,
        pub else_branch: Option<Stmt>,
    }

    pub enum Stmt {
        Pass,
        Error(&'static str),
        Assign(&'static str, Expr),
        Eval(Expr),
    }

    pub enum Expr {
        Ident(&'static str),
        Field(&'static str, FieldKind),
        Int(i64),
        Float(f64),
        Str(&'static str),
        Call(Builtin, &'static Expr),
        Binary(BinOp, &'static Expr, &'static Expr),
        Compare(CmpOp, &'static Expr, &'static Expr),
    }

    #[derive(Clone, Copy)]
    pub enum FieldKind {
        Value,
        Line,
        Column,
    }

    #[derive(Clone, Copy)]
    pub enum Builtin {
        Int,
        Float,
        Str,
        Len,
    }

    #[derive(Clone, Copy, PartialEq)]
    pub enum BinOp {
        Add,
        Sub,
        Mul,
        Div,
        Rem,
    }

    #[derive(Clone, Copy)]
    pub enum CmpOp {
        Eq,
        Ne,
        Lt,
        Le,
        Gt,
        Ge,
    }

    // ------------------------------------------------------------------
    // Values and results
    // ------------------------------------------------------------------

    /// A lexed token with its 1-based source position.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Token {
        pub name: String,
        pub text: String,
        pub line: usize,
        pub column: usize,
    }

    impl fmt::Display for Token {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "'{}'", self.text)
        }
    }

    /// Placeholder produced where a rule failed and recovery resynchronized.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ErrorNode {
        pub message: String,
        pub line: usize,
        pub column: usize,
        pub skipped: usize,
    }

    impl fmt::Display for ErrorNode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "<error at {}:{}: {}>", self.line, self.column, self.message)
        }
    }

    /// Any value an action, binding, or repetition can produce.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Value {
        Null,
        Bool(bool),
        Int(i64),
        Float(f64),
        Str(String),
        Token(Token),
        List(Vec<Value>),
        Node { name: String, args: Vec<Value> },
        Error(ErrorNode),
    }

    impl Value {
        pub fn is_error(&self) -> bool {
            matches!(self, Self::Error(_))
        }

        fn truthy(&self) -> bool {
            match self {
                Self::Null => false,
                Self::Bool(b) => *b,
                Self::Int(v) => *v != 0,
                Self::Float(v) => *v != 0.0,
                Self::Str(s) => !s.is_empty(),
                Self::List(items) => !items.is_empty(),
                Self::Token(_) | Self::Node { .. } => true,
                Self::Error(_) => false,
            }
        }
    }

    impl fmt::Display for Value {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Null => write!(f, "null"),
                Self::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
                Self::Int(v) => write!(f, "{v}"),
                Self::Float(v) => {
                    if v.fract() == 0.0 {
                        write!(f, "{v:.1}")
                    } else {
                        write!(f, "{v}")
                    }
                }
                Self::Str(s) => write!(f, "'{s}'"),
                Self::Token(token) => write!(f, "{token}"),
                Self::List(items) => {
                    write!(f, "[")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{item}")?;
                    }
                    write!(f, "]")
                }
                Self::Node { name, args } => {
                    write!(f, "{name}(")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, ")")
                }
                Self::Error(node) => write!(f, "{node}"),
            }
        }
    }

    /// A positioned parse-time error. Parses collect these and finish;
    /// nothing is thrown past the API boundary.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParseError {
        pub message: String,
        pub line: usize,
        pub column: usize,
    }

    impl fmt::Display for ParseError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(
                f,
                "{} at line {}, column {}",
                self.message, self.line, self.column
            )
        }
    }

    /// Outcome of one parse.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ParseResult {
        pub ast: Value,
        pub errors: Vec<ParseError>,
        pub tokens: Vec<Token>,
    }

    impl ParseResult {
        pub fn is_valid(&self) -> bool {
            self.errors.is_empty()
        }
    }

    // ------------------------------------------------------------------
    // Lexer
    // ------------------------------------------------------------------

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

    struct Lexed {
        tokens: Vec<Token>,
        errors: Vec<ParseError>,
        end: (usize, usize),
    }

    fn lex(grammar: &'static Grammar, input: &str) -> Lexed {
        let regexes: Vec<Regex> = grammar
            .tokens
            .iter()
            .map(|spec| {
                Regex::new(&format!(r"\A(?:{})", spec.pattern))
                    .expect("token pattern was validated at generation time")
            })
            .collect();

        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut pos = 0;
        let mut line = 1;
        let mut column = 1;

        'outer: while pos < input.len() {
            for (spec, regex) in grammar.tokens.iter().zip(&regexes) {
                let Some(found) = regex.find(&input[pos..]) else {
                    continue;
                };
                if found.end() == 0 {
                    errors.push(ParseError {
                        message: format!(
                            "token {} matched zero characters; patterns must consume input",
                            spec.name
                        ),
                        line,
                        column,
                    });
                    break 'outer;
                }
                let text = &input[pos..pos + found.end()];
                if !spec.skip {
                    tokens.push(Token {
                        name: spec.name.to_string(),
                        text: text.to_string(),
                        line,
                        column,
                    });
                }
                advance(&mut line, &mut column, text);
                pos += found.end();
                continue 'outer;
            }

            let c = input[pos..].chars().next().expect("position inside input");
            errors.push(ParseError {
                message: format!("unexpected character {c:?}"),
                line,
                column,
            });
            tokens.push(Token {
                name: ERROR_TOKEN.to_string(),
                text: c.to_string(),
                line,
                column,
            });
            advance(&mut line, &mut column, &input[pos..pos + c.len_utf8()]);
            pos += c.len_utf8();
        }

        Lexed {
            tokens,
            errors,
            end: (line, column),
        }
    }

    // ------------------------------------------------------------------
    // Fragment evaluation
    // ------------------------------------------------------------------

    fn text_of(value: &Value) -> String {
        match value {
            Value::Token(token) => token.text.clone(),
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn to_int(value: &Value) -> Result<i64, String> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::Float(v) => Ok(*v as i64),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Token(_) | Value::Str(_) => {
                let text = text_of(value);
                text.trim()
                    .parse()
                    .map_err(|_| format!("cannot convert {text:?} to int"))
            }
            other => Err(format!("cannot convert {other} to int")),
        }
    }

    fn to_float(value: &Value) -> Result<f64, String> {
        match value {
            Value::Int(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Token(_) | Value::Str(_) => {
                let text = text_of(value);
                text.trim()
                    .parse()
                    .map_err(|_| format!("cannot convert {text:?} to float"))
            }
            other => Err(format!("cannot convert {other} to float")),
        }
    }

    fn length_of(value: &Value) -> Result<i64, String> {
        let len = match value {
            Value::Str(s) => s.chars().count(),
            Value::Token(token) => token.text.chars().count(),
            Value::List(items) => items.len(),
            Value::Node { args, .. } => args.len(),
            other => return Err(format!("{other} has no length")),
        };
        Ok(len as i64)
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

    fn values_equal(lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::Token(t), Value::Str(s)) | (Value::Str(s), Value::Token(t)) => t.text == *s,
            (Value::Int(l), Value::Float(r)) | (Value::Float(r), Value::Int(l)) => *l as f64 == *r,
            _ => lhs == rhs,
        }
    }

    fn eval_expr(expr: &Expr, scope: &HashMap<&'static str, Value>) -> Result<Value, String> {
        match expr {
            Expr::Ident(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| format!("unbound name '{name}'")),
            Expr::Field(base, kind) => {
                let value = scope
                    .get(base)
                    .ok_or_else(|| format!("unbound name '{base}'"))?;
                let Value::Token(token) = value else {
                    return Err(format!("'{base}' is not a token"));
                };
                Ok(match kind {
                    FieldKind::Value => Value::Str(token.text.clone()),
                    FieldKind::Line => Value::Int(token.line as i64),
                    FieldKind::Column => Value::Int(token.column as i64),
                })
            }
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Str(s) => Ok(Value::Str((*s).to_string())),
            Expr::Call(builtin, arg) => {
                let arg = eval_expr(arg, scope)?;
                match builtin {
                    Builtin::Int => to_int(&arg).map(Value::Int),
                    Builtin::Float => to_float(&arg).map(Value::Float),
                    Builtin::Str => Ok(Value::Str(text_of(&arg))),
                    Builtin::Len => length_of(&arg).map(Value::Int),
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = eval_expr(lhs, scope)?;
                let rhs = eval_expr(rhs, scope)?;
                if *op == BinOp::Add {
                    if let (Value::Str(_) | Value::Token(_), _) | (_, Value::Str(_) | Value::Token(_)) =
                        (&lhs, &rhs)
                    {
                        return Ok(Value::Str(format!("{}{}", text_of(&lhs), text_of(&rhs))));
                    }
                }
                let Some((l, r, both_int)) = numeric_pair(&lhs, &rhs) else {
                    return Err(format!("cannot apply arithmetic to {lhs} and {rhs}"));
                };
                if matches!(op, BinOp::Div | BinOp::Rem) && r == 0.0 {
                    return Err("division by zero".to_string());
                }
                let result = match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Rem => l % r,
                };
                Ok(if both_int {
                    Value::Int(match op {
                        BinOp::Div => (l as i64) / (r as i64),
                        BinOp::Rem => (l as i64) % (r as i64),
                        _ => result as i64,
                    })
                } else {
                    Value::Float(result)
                })
            }
            Expr::Compare(op, lhs, rhs) => {
                let lhs = eval_expr(lhs, scope)?;
                let rhs = eval_expr(rhs, scope)?;
                let outcome = match op {
                    CmpOp::Eq => values_equal(&lhs, &rhs),
                    CmpOp::Ne => !values_equal(&lhs, &rhs),
                    ordered => {
                        if let Some((l, r, _)) = numeric_pair(&lhs, &rhs) {
                            match ordered {
                                CmpOp::Lt => l < r,
                                CmpOp::Le => l <= r,
                                CmpOp::Gt => l > r,
                                CmpOp::Ge => l >= r,
                                CmpOp::Eq | CmpOp::Ne => unreachable!(),
                            }
                        } else {
                            let (l, r) = (text_of(&lhs), text_of(&rhs));
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
        }
    }

    // ------------------------------------------------------------------
    // Packrat parser
    // ------------------------------------------------------------------

    #[derive(Debug, Clone)]
    struct Failure {
        message: String,
        pos: usize,
        custom: bool,
    }

    #[derive(Clone)]
    enum MemoEntry {
        Done(Result<(Value, usize), Failure>),
        Growing(Option<(Value, usize)>),
    }

    struct Parser {
        grammar: &'static Grammar,
        tokens: Vec<Token>,
        end: (usize, usize),
        pos: usize,
        memo: HashMap<(usize, usize), MemoEntry>,
        errors: Vec<ParseError>,
        recovery: bool,
        entry: usize,
        furthest: Option<Failure>,
    }

    /// Parse `input` from rule `entry` of the grammar image.
    pub fn parse_with(
        grammar: &'static Grammar,
        entry: usize,
        input: &str,
        enable_recovery: bool,
    ) -> ParseResult {
        let Lexed {
            tokens,
            errors: lex_errors,
            end,
        } = lex(grammar, input);

        let mut parser = Parser {
            grammar,
            tokens,
            end,
            pos: 0,
            memo: HashMap::new(),
            errors: Vec::new(),
            recovery: enable_recovery,
            entry,
            furthest: None,
        };

        let ast = match parser.apply_rule(entry) {
            Ok(value) => {
                if parser.pos < parser.tokens.len() {
                    let failure = match &parser.furthest {
                        Some(f) if f.pos >= parser.pos => f.clone(),
                        _ => {
                            let token = &parser.tokens[parser.pos];
                            Failure {
                                message: format!(
                                    "expected end of input, found {}",
                                    token.name
                                ),
                                pos: parser.pos,
                                custom: false,
                            }
                        }
                    };
                    parser.record(&failure);
                }
                value
            }
            Err(failure) => {
                let failure = match &parser.furthest {
                    Some(f) if f.pos > failure.pos && !failure.custom => f.clone(),
                    _ => failure,
                };
                parser.record(&failure);
                Value::Null
            }
        };

        let mut errors = lex_errors;
        errors.extend(parser.errors);
        ParseResult {
            ast,
            errors,
            tokens: parser.tokens,
        }
    }

    impl Parser {
        fn position(&self, pos: usize) -> (usize, usize) {
            match self.tokens.get(pos) {
                Some(token) => (token.line, token.column),
                None => self.end,
            }
        }

        fn fail(&mut self, message: String, pos: usize, custom: bool) -> Failure {
            let failure = Failure {
                message,
                pos,
                custom,
            };
            self.note(&failure);
            failure
        }

        fn note(&mut self, failure: &Failure) {
            let better = match &self.furthest {
                None => true,
                Some(current) => {
                    failure.pos > current.pos || (failure.pos == current.pos && failure.custom)
                }
            };
            if better {
                self.furthest = Some(failure.clone());
            }
        }

        fn record(&mut self, failure: &Failure) {
            let (line, column) = self.position(failure.pos);
            self.errors.push(ParseError {
                message: failure.message.clone(),
                line,
                column,
            });
        }

        fn apply_rule(&mut self, id: usize) -> Result<Value, Failure> {
            let key = (id, self.pos);
            match self.memo.get(&key) {
                Some(MemoEntry::Done(Ok((value, end)))) => {
                    self.pos = *end;
                    return Ok(value.clone());
                }
                Some(MemoEntry::Done(Err(failure))) => return Err(failure.clone()),
                Some(MemoEntry::Growing(seed)) => {
                    return match seed {
                        Some((value, end)) => {
                            self.pos = *end;
                            Ok(value.clone())
                        }
                        None => Err(Failure {
                            message: format!(
                                "left recursion in rule '{}' with no seed",
                                self.grammar.rules[id].name
                            ),
                            pos: self.pos,
                            custom: false,
                        }),
                    };
                }
                None => {}
            }

            let start = self.pos;

            if !self.grammar.rules[id].left_recursive {
                self.memo.insert(key, MemoEntry::Growing(None));
                let outcome = self.eval_rule_body(id, start);
                let entry = match &outcome {
                    Ok(value) => MemoEntry::Done(Ok((value.clone(), self.pos))),
                    Err(failure) => MemoEntry::Done(Err(failure.clone())),
                };
                self.memo.insert(key, entry);
                return outcome;
            }

            // Seed-growing for direct left recursion.
            self.memo.insert(key, MemoEntry::Growing(None));
            let mut best: Option<(Value, usize)> = None;
            loop {
                self.pos = start;
                match self.eval_rule_body(id, start) {
                    Ok(value) => {
                        let end = self.pos;
                        if best.as_ref().is_some_and(|(_, best_end)| end <= *best_end) {
                            break;
                        }
                        best = Some((value, end));
                        self.memo.insert(key, MemoEntry::Growing(best.clone()));
                    }
                    Err(failure) => {
                        if best.is_none() {
                            self.memo.insert(key, MemoEntry::Done(Err(failure.clone())));
                            self.pos = start;
                            return Err(failure);
                        }
                        break;
                    }
                }
            }

            let (value, end) = best.expect("grow loop without a seed");
            self.pos = end;
            self.memo
                .insert(key, MemoEntry::Done(Ok((value.clone(), end))));
            Ok(value)
        }

        fn eval_rule_body(&mut self, id: usize, start: usize) -> Result<Value, Failure> {
            let rule = &self.grammar.rules[id];
            let mut failures: Vec<Failure> = Vec::new();

            for alt in rule.alternatives {
                self.pos = start;
                let error_snapshot = self.errors.len();
                match self.eval_alternative(alt) {
                    Ok(value) => {
                        if self.recovery && value.is_error() {
                            self.errors.truncate(error_snapshot);
                            failures.push(Failure {
                                message: format!(
                                    "no alternative matched for rule '{}'",
                                    rule.name
                                ),
                                pos: self.pos,
                                custom: false,
                            });
                            continue;
                        }
                        return Ok(value);
                    }
                    Err(failure) => {
                        self.errors.truncate(error_snapshot);
                        failures.push(failure);
                    }
                }
            }

            self.pos = start;
            let deepest = failures.iter().map(|f| f.pos).max().unwrap_or(start);
            let failure = failures
                .iter()
                .find(|f| f.custom)
                .cloned()
                .unwrap_or_else(|| Failure {
                    message: format!("no alternative matched for rule '{}'", rule.name),
                    pos: deepest,
                    custom: false,
                });
            self.note(&failure);

            if self.recovery && (id == self.entry || deepest > start) {
                self.record(&failure);
                let (line, column) = self.position(failure.pos);
                self.pos = deepest;
                self.skip_to_sync(rule);
                let node = ErrorNode {
                    message: failure.message,
                    line,
                    column,
                    skipped: self.pos - start,
                };
                return Ok(Value::Error(node));
            }

            Err(failure)
        }

        fn skip_to_sync(&mut self, rule: &Rule) {
            while let Some(token) = self.tokens.get(self.pos) {
                if rule.sync.binary_search(&token.name.as_str()).is_ok() {
                    break;
                }
                self.pos += 1;
            }
        }

        fn eval_alternative(&mut self, alt: &'static Alt) -> Result<Value, Failure> {
            let mut scope: HashMap<&'static str, Value> = HashMap::new();
            let mut term_values: Vec<Value> = Vec::with_capacity(alt.terms.len());

            for term in alt.terms {
                let value = self.eval_term(term)?;
                if let Some(name) = term.binding {
                    scope.insert(name, value.clone());
                }
                term_values.push(value);
            }

            let mut value = match &alt.action {
                Action::Pass => {
                    let mut bound = alt
                        .terms
                        .iter()
                        .zip(&term_values)
                        .filter(|(term, _)| term.binding.is_some());
                    match (bound.next(), bound.next()) {
                        (Some((_, value)), None) => value.clone(),
                        _ => {
                            let mut plain = alt
                                .terms
                                .iter()
                                .zip(&term_values)
                                .filter(|(term, _)| !term.from_literal);
                            match (plain.next(), plain.next()) {
                                (Some((_, value)), None) => value.clone(),
                                _ => Value::Null,
                            }
                        }
                    }
                }
                Action::Construct { name, args } => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in *args {
                        let value = eval_expr(arg, &scope)
                            .map_err(|e| self.fail(e, self.pos, true))?;
                        values.push(value);
                    }
                    Value::Node {
                        name: (*name).to_string(),
                        args: values,
                    }
                }
                Action::Value(expr) => {
                    eval_expr(expr, &scope).map_err(|e| self.fail(e, self.pos, true))?
                }
            };

            if let Some(guard) = &alt.guard {
                scope.insert("res", value);
                let condition = eval_expr(&guard.condition, &scope)
                    .map_err(|e| self.fail(e, self.pos, true))?;
                let branch = if condition.truthy() {
                    Some(&guard.then_branch)
                } else {
                    guard.else_branch.as_ref()
                };
                if let Some(stmt) = branch {
                    match stmt {
                        Stmt::Pass => {}
                        Stmt::Error(message) => {
                            return Err(self.fail((*message).to_string(), self.pos, true));
                        }
                        Stmt::Assign(name, expr) => {
                            let assigned = eval_expr(expr, &scope)
                                .map_err(|e| self.fail(e, self.pos, true))?;
                            scope.insert(name, assigned);
                        }
                        Stmt::Eval(expr) => {
                            eval_expr(expr, &scope).map_err(|e| self.fail(e, self.pos, true))?;
                        }
                    }
                }
                value = scope.remove("res").expect("guard scope keeps res");
            }

            Ok(value)
        }

        fn eval_term(&mut self, term: &'static Term) -> Result<Value, Failure> {
            match term.quantifier {
                None => self.eval_base(term.matcher),
                Some(Quant::Optional) => {
                    let save = self.pos;
                    match self.eval_base(term.matcher) {
                        Ok(value) => Ok(value),
                        Err(_) => {
                            self.pos = save;
                            Ok(Value::Null)
                        }
                    }
                }
                Some(Quant::Star) => Ok(Value::List(self.eval_repeat(term.matcher))),
                Some(Quant::Plus) => {
                    let first = self.eval_base(term.matcher)?;
                    let mut items = vec![first];
                    items.extend(self.eval_repeat(term.matcher));
                    Ok(Value::List(items))
                }
            }
        }

        fn eval_repeat(&mut self, matcher: Matcher) -> Vec<Value> {
            let mut items = Vec::new();
            loop {
                let save = self.pos;
                match self.eval_base(matcher) {
                    Ok(value) => {
                        items.push(value);
                        if self.pos == save {
                            break;
                        }
                    }
                    Err(_) => {
                        self.pos = save;
                        break;
                    }
                }
            }
            items
        }

        fn eval_base(&mut self, matcher: Matcher) -> Result<Value, Failure> {
            match matcher {
                Matcher::Rule(id) => self.apply_rule(id),
                Matcher::Token(id) => {
                    let spec = &self.grammar.tokens[id];
                    match self.tokens.get(self.pos) {
                        Some(token) if token.name == spec.name => {
                            let token = token.clone();
                            self.pos += 1;
                            Ok(Value::Token(token))
                        }
                        found => {
                            let wanted = if spec.synthetic {
                                format!("'{}'", spec.name)
                            } else {
                                spec.name.to_string()
                            };
                            let found = match found {
                                Some(token) => token.name.clone(),
                                None => "end of input".to_string(),
                            };
                            let pos = self.pos;
                            Err(self.fail(
                                format!("expected {wanted}, found {found}"),
                                pos,
                                false,
                            ))
                        }
                    }
                }
            }
        }
    }
}
