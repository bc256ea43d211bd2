//! Shared utilities for the apy parser-generator tools.

pub mod config;
pub mod formatter;

pub use config::Config;
pub use formatter::SuiteReport;

/// Process exit codes shared by every tool in the workspace.
pub mod exit {
    /// Everything succeeded.
    pub const OK: i32 = 0;
    /// One or more grammar-embedded tests failed.
    pub const TESTS_FAILED: i32 = 1;
    /// The grammar had syntax or semantic errors; nothing was emitted.
    pub const GRAMMAR_ERRORS: i32 = 2;
    /// Reading the input or writing the output failed.
    pub const IO_ERROR: i32 = 3;
    /// The command line itself was invalid.
    pub const USAGE: i32 = 4;
}
