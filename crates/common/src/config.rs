//! Command line configuration for the apy generator tools.

use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

/// Build configuration consumed by the compilation pipeline.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path of the .apy grammar file
    #[arg(value_name = "GRAMMAR")]
    pub input: String,

    /// Directory for generated parser files
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output_dir: String,

    /// Skip the grammar-embedded tests before generation
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "only_tests")]
    pub no_tests: bool,

    /// Run the grammar-embedded tests only, without generating files
    #[arg(long = "tests", action = ArgAction::SetTrue)]
    pub only_tests: bool,

    /// Generate parsers without panic-mode error recovery
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_recovery: bool,

    /// Run the whole pipeline but write nothing to disk
    #[arg(long, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Verbose output (debug-level logging)
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Config {
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Stem of the input path, used for log headers.
    pub fn input_name(&self) -> String {
        Path::new(&self.input)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| "grammar".into())
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn run_tests(&self) -> bool {
        !self.no_tests
    }

    pub fn only_tests(&self) -> bool {
        self.only_tests
    }

    pub fn recovery_enabled(&self) -> bool {
        !self.no_recovery
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether any file should be written at all.
    pub fn writes_output(&self) -> bool {
        !self.only_tests && !self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    #[test]
    fn defaults() {
        let cfg = Config::parse_from(["apygen", "calc.apy"]);
        assert_eq!(cfg.input(), "calc.apy");
        assert_eq!(cfg.input_name(), "calc");
        assert!(cfg.run_tests());
        assert!(cfg.recovery_enabled());
        assert!(cfg.writes_output());
    }

    #[test]
    fn tests_only_suppresses_output() {
        let cfg = Config::parse_from(["apygen", "calc.apy", "--tests"]);
        assert!(cfg.only_tests());
        assert!(!cfg.writes_output());
    }

    #[test]
    fn no_tests_and_dry_run() {
        let cfg = Config::parse_from(["apygen", "calc.apy", "--no-tests", "--dry-run"]);
        assert!(!cfg.run_tests());
        assert!(cfg.dry_run());
        assert!(!cfg.writes_output());
    }

    #[test]
    fn conflicting_test_flags_rejected() {
        assert!(Config::try_parse_from(["apygen", "calc.apy", "--no-tests", "--tests"]).is_err());
    }
}
