//! Rendering a compiled grammar into a standalone parser source file.
//!
//! The output has two halves: a structured half (AST node declarations,
//! the static grammar image, the public entry points) assembled as a token
//! stream and pretty-printed, and the runtime template appended verbatim.
//! Given the same grammar and flags the output is byte-identical.

use analyzer::{CompiledAlt, CompiledGrammar, CompiledRule, CompiledTerm, Matcher, TokenSpec};
use parser::fragment::{BinOp, CmpOp};
use parser::{Action, Expr, Field, Guard, GuardStmt, Quantifier};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::BTreeMap;

/// The runtime module emitted verbatim into every generated parser.
pub const RUNTIME_TEMPLATE: &str = include_str!("templates/runtime.rs");

/// File name convention for generated parsers.
#[must_use]
pub fn parser_file_name(grammar_name: &str) -> String {
    format!("{grammar_name}_parser.rs")
}

/// Render the complete parser source for one grammar.
#[must_use]
pub fn generate_parser(compiled: &CompiledGrammar, enable_recovery: bool) -> String {
    let header = format!(
        "//! Parser for grammar `{}`.\n//!\n//! This file is generated; edit the grammar instead.\n//! The only external dependency is the `regex` crate.\n\n",
        compiled.name()
    );
    let items = structured_items(compiled, enable_recovery);
    let file: syn::File = syn::parse2(items).expect("generated items form a valid file");
    let rendered = prettyplease::unparse(&file);
    format!("{header}{rendered}\n{RUNTIME_TEMPLATE}")
}

fn structured_items(compiled: &CompiledGrammar, enable_recovery: bool) -> TokenStream {
    let ast = ast_module(compiled);
    let image = grammar_image(compiled, enable_recovery);
    let api = api_functions(compiled, enable_recovery);
    quote! {
        #ast
        #image
        #api
    }
}

/// Constructor names with their arities, first occurrence wins, sorted for
/// deterministic output.
fn constructor_arities(compiled: &CompiledGrammar) -> BTreeMap<String, usize> {
    let mut arities = BTreeMap::new();
    for rule in compiled.rules() {
        for alt in rule.alternatives() {
            if let Action::Construct { name, args } = alt.action() {
                arities.entry(name.clone()).or_insert(args.len());
            }
        }
    }
    arities
}

fn ast_module(compiled: &CompiledGrammar) -> TokenStream {
    let arities = constructor_arities(compiled);
    if arities.is_empty() {
        return quote! {
            /// No constructors are used by this grammar's actions.
            pub mod ast {}
        };
    }
    let declarations = arities.into_iter().map(|(name, arity)| {
        let ident = format_ident!("{name}");
        if arity == 0 {
            quote! {
                #[derive(Debug, Clone, PartialEq)]
                pub struct #ident;

                impl #ident {
                    pub const NAME: &'static str = #name;

                    pub fn from_value(value: &Value) -> Option<Self> {
                        match value {
                            Value::Node { name, args } if name == #name && args.is_empty() => {
                                Some(Self)
                            }
                            _ => None,
                        }
                    }
                }
            }
        } else {
            let fields = (0..arity).map(|_| quote! { pub Value });
            let takes = (0..arity).map(|_| quote! { fields.next()? });
            quote! {
                #[derive(Debug, Clone, PartialEq)]
                pub struct #ident(#(#fields),*);

                impl #ident {
                    pub const NAME: &'static str = #name;

                    pub fn from_value(value: &Value) -> Option<Self> {
                        match value {
                            Value::Node { name, args } if name == #name && args.len() == #arity => {
                                let mut fields = args.iter().cloned();
                                Some(Self(#(#takes),*))
                            }
                            _ => None,
                        }
                    }
                }
            }
        }
    });

    quote! {
        /// Typed views over the dynamic parse values, one per constructor
        /// used by the grammar's actions.
        pub mod ast {
            use super::runtime::Value;

            #(#declarations)*
        }
    }
}

fn grammar_image(compiled: &CompiledGrammar, enable_recovery: bool) -> TokenStream {
    let name = compiled.name();
    let tokens = compiled.tokens().iter().map(token_spec);
    let rules = compiled
        .rules()
        .iter()
        .map(|rule| rule_image(rule, enable_recovery));
    let start = compiled.start();
    quote! {
        /// The compiled grammar image that parameterizes the runtime.
        static GRAMMAR: runtime::Grammar = runtime::Grammar {
            name: #name,
            tokens: &[#(#tokens),*],
            rules: &[#(#rules),*],
            start: #start,
        };
    }
}

fn token_spec(spec: &TokenSpec) -> TokenStream {
    let name = spec.name();
    let pattern = spec.pattern();
    let skip = spec.is_skip();
    let synthetic = spec.is_synthetic();
    quote! {
        runtime::TokenSpec {
            name: #name,
            pattern: #pattern,
            skip: #skip,
            synthetic: #synthetic,
        }
    }
}

fn rule_image(rule: &CompiledRule, enable_recovery: bool) -> TokenStream {
    let name = rule.name();
    let alternatives = rule.alternatives().iter().map(alt_image);
    let left_recursive = rule.is_left_recursive();
    // Without recovery there is no synchronization path to drive.
    let sync: Vec<&str> = if enable_recovery {
        rule.sync_tokens().iter().map(String::as_str).collect()
    } else {
        Vec::new()
    };
    quote! {
        runtime::Rule {
            name: #name,
            alternatives: &[#(#alternatives),*],
            left_recursive: #left_recursive,
            sync: &[#(#sync),*],
        }
    }
}

fn alt_image(alt: &CompiledAlt) -> TokenStream {
    let terms = alt.terms().iter().map(term_image);
    let action = action_image(alt.action());
    let guard = match alt.guard() {
        Some(guard) => {
            let guard = guard_image(guard);
            quote! { Some(#guard) }
        }
        None => quote! { None },
    };
    quote! {
        runtime::Alt {
            terms: &[#(#terms),*],
            action: #action,
            guard: #guard,
        }
    }
}

fn term_image(term: &CompiledTerm) -> TokenStream {
    let binding = match term.binding() {
        Some(name) => quote! { Some(#name) },
        None => quote! { None },
    };
    let matcher = match term.matcher() {
        Matcher::Rule(id) => quote! { runtime::Matcher::Rule(#id) },
        Matcher::Token(id) => quote! { runtime::Matcher::Token(#id) },
    };
    let quantifier = match term.quantifier() {
        Some(Quantifier::Optional) => quote! { Some(runtime::Quant::Optional) },
        Some(Quantifier::Star) => quote! { Some(runtime::Quant::Star) },
        Some(Quantifier::Plus) => quote! { Some(runtime::Quant::Plus) },
        None => quote! { None },
    };
    let from_literal = term.is_from_literal();
    quote! {
        runtime::Term {
            binding: #binding,
            matcher: #matcher,
            quantifier: #quantifier,
            from_literal: #from_literal,
        }
    }
}

fn action_image(action: &Action) -> TokenStream {
    match action {
        Action::Pass => quote! { runtime::Action::Pass },
        Action::Construct { name, args } => {
            let args = args.iter().map(expr_image);
            quote! {
                runtime::Action::Construct {
                    name: #name,
                    args: &[#(#args),*],
                }
            }
        }
        Action::Value(expr) => {
            let expr = expr_image(expr);
            quote! { runtime::Action::Value(#expr) }
        }
    }
}

fn guard_image(guard: &Guard) -> TokenStream {
    let condition = expr_image(guard.condition());
    let then_branch = stmt_image(guard.then_branch());
    let else_branch = match guard.else_branch() {
        Some(stmt) => {
            let stmt = stmt_image(stmt);
            quote! { Some(#stmt) }
        }
        None => quote! { None },
    };
    quote! {
        runtime::Guard {
            condition: #condition,
            then_branch: #then_branch,
            else_branch: #else_branch,
        }
    }
}

fn stmt_image(stmt: &GuardStmt) -> TokenStream {
    match stmt {
        GuardStmt::Pass => quote! { runtime::Stmt::Pass },
        GuardStmt::Error(message) => quote! { runtime::Stmt::Error(#message) },
        GuardStmt::Assign { name, value } => {
            let value = expr_image(value);
            quote! { runtime::Stmt::Assign(#name, #value) }
        }
        GuardStmt::Eval(expr) => {
            let expr = expr_image(expr);
            quote! { runtime::Stmt::Eval(#expr) }
        }
    }
}

fn expr_image(expr: &Expr) -> TokenStream {
    match expr {
        Expr::Ident(name) => quote! { runtime::Expr::Ident(#name) },
        Expr::FieldAccess { base, field } => {
            let kind = match Field::from_name(field).expect("field validated by the checker") {
                Field::Value => quote! { runtime::FieldKind::Value },
                Field::Line => quote! { runtime::FieldKind::Line },
                Field::Column => quote! { runtime::FieldKind::Column },
            };
            quote! { runtime::Expr::Field(#base, #kind) }
        }
        Expr::Int(v) => quote! { runtime::Expr::Int(#v) },
        Expr::Float(v) => quote! { runtime::Expr::Float(#v) },
        Expr::Str(s) => quote! { runtime::Expr::Str(#s) },
        Expr::Call { func, arg } => {
            let builtin = match func.as_str() {
                "int" => quote! { runtime::Builtin::Int },
                "float" => quote! { runtime::Builtin::Float },
                "str" => quote! { runtime::Builtin::Str },
                "len" => quote! { runtime::Builtin::Len },
                other => unreachable!("builtin '{other}' validated by the checker"),
            };
            let arg = expr_image(arg);
            quote! { runtime::Expr::Call(#builtin, &#arg) }
        }
        Expr::Binary { op, lhs, rhs } => {
            let op = match op {
                BinOp::Add => quote! { runtime::BinOp::Add },
                BinOp::Sub => quote! { runtime::BinOp::Sub },
                BinOp::Mul => quote! { runtime::BinOp::Mul },
                BinOp::Div => quote! { runtime::BinOp::Div },
                BinOp::Rem => quote! { runtime::BinOp::Rem },
            };
            let lhs = expr_image(lhs);
            let rhs = expr_image(rhs);
            quote! { runtime::Expr::Binary(#op, &#lhs, &#rhs) }
        }
        Expr::Compare { op, lhs, rhs } => {
            let op = match op {
                CmpOp::Eq => quote! { runtime::CmpOp::Eq },
                CmpOp::Ne => quote! { runtime::CmpOp::Ne },
                CmpOp::Lt => quote! { runtime::CmpOp::Lt },
                CmpOp::Le => quote! { runtime::CmpOp::Le },
                CmpOp::Gt => quote! { runtime::CmpOp::Gt },
                CmpOp::Ge => quote! { runtime::CmpOp::Ge },
            };
            let lhs = expr_image(lhs);
            let rhs = expr_image(rhs);
            quote! { runtime::Expr::Compare(#op, &#lhs, &#rhs) }
        }
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::new();
    let mut prev_upper = true;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !prev_upper {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_upper = true;
        } else {
            out.push(c);
            prev_upper = false;
        }
    }
    out
}

fn api_functions(compiled: &CompiledGrammar, enable_recovery: bool) -> TokenStream {
    let per_rule = compiled.rules().iter().enumerate().map(|(id, rule)| {
        let fn_name = format_ident!("parse_{}", snake_case(rule.name()));
        let doc = format!("Parse `input` starting at rule `{}`.", rule.name());
        quote! {
            #[doc = #doc]
            pub fn #fn_name(input: &str) -> runtime::ParseResult {
                runtime::parse_with(&GRAMMAR, #id, input, RECOVERY_ENABLED)
            }
        }
    });

    quote! {
        /// Recovery default baked in at generation time.
        pub const RECOVERY_ENABLED: bool = #enable_recovery;

        /// Parse `input` from the start rule.
        pub fn parse(input: &str) -> runtime::ParseResult {
            runtime::parse_with(&GRAMMAR, GRAMMAR.start, input, RECOVERY_ENABLED)
        }

        /// Parse `input` from the start rule with an explicit recovery
        /// setting.
        pub fn parse_with_recovery(input: &str, enable_recovery: bool) -> runtime::ParseResult {
            runtime::parse_with(&GRAMMAR, GRAMMAR.start, input, enable_recovery)
        }

        /// Parse `input` starting at any rule, by name.
        pub fn parse_named(rule: &str, input: &str) -> Option<runtime::ParseResult> {
            let id = GRAMMAR.rule_id(rule)?;
            Some(runtime::parse_with(&GRAMMAR, id, input, RECOVERY_ENABLED))
        }

        #(#per_rule)*
    }
}
