//! Code emission for compiled `.apy` grammars.
//!
//! Turns a checked, compiled grammar image into a standalone Rust parser
//! source file (`<GrammarName>_parser.rs`): AST node declarations, the
//! static grammar tables, per-rule entry points, and a verbatim copy of
//! the parse runtime. Also hosts the build-pipeline binary.

pub mod emit;
pub mod scaffold;


pub use emit::{generate_parser, parser_file_name, RUNTIME_TEMPLATE};
pub use scaffold::{write_parser_file, write_project};
