use std::fs;
use std::process;

use analyzer::{analyze, Severity};
use clap::Parser;
use common::{exit, Config};
use engine::EngineOptions;
use generator::emit::generate_parser;
use generator::scaffold::write_parser_file;
use parser::parse_str;
use testing::run_grammar_tests;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let config = match Config::try_parse() {
        Ok(config) => config,
        Err(err) => {
            // clap renders its own message (including --help/--version).
            let _ = err.print();
            return if err.use_stderr() { exit::USAGE } else { exit::OK };
        }
    };

    let default_filter = if config.verbose() { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let source = match fs::read_to_string(config.input()) {
        Ok(source) => source,
        Err(err) => {
            error!("failed to read {}: {err}", config.input());
            return exit::IO_ERROR;
        }
    };

    info!("reading grammar from {}", config.input());
    let parsed = parse_str(&source);
    for err in parsed.errors() {
        error!("{err}");
    }

    let mut grammar_errors = !parsed.is_clean();
    let mut tests_failed = false;
    let mut io_failed = false;

    if parsed.grammars().is_empty() {
        warn!("no grammars found in {}", config.input());
    }

    for grammar in parsed.grammars() {
        info!("checking grammar: {}", grammar.name());
        let analysis = analyze(grammar);
        for diagnostic in analysis.diagnostics() {
            match diagnostic.severity() {
                Severity::Advice => info!("{diagnostic}"),
                Severity::Warning => warn!("{diagnostic}"),
                Severity::Error => error!("{diagnostic}"),
            }
        }
        let Some(compiled) = analysis.compiled() else {
            grammar_errors = true;
            error!(
                "grammar '{}' has errors; no parser will be generated",
                grammar.name()
            );
            continue;
        };

        let options = EngineOptions {
            recovery: config.recovery_enabled(),
            ..EngineOptions::default()
        };

        if config.run_tests() {
            match run_grammar_tests(grammar, compiled, options) {
                Ok(true) => {}
                Ok(false) => {
                    tests_failed = true;
                    error!(
                        "aborting generation for '{}' due to test failures",
                        grammar.name()
                    );
                    continue;
                }
                Err(err) => {
                    grammar_errors = true;
                    error!("cannot run tests for '{}': {err}", grammar.name());
                    continue;
                }
            }
        } else if !grammar.suites().is_empty() {
            warn!(
                "skipping tests for '{}'; run them to verify parser correctness",
                grammar.name()
            );
        }

        if config.only_tests() {
            info!(
                "tests passed for '{}'; skipping file generation (--tests)",
                grammar.name()
            );
            continue;
        }

        let generated = generate_parser(compiled, config.recovery_enabled());
        if config.dry_run() {
            info!(
                "dry run: would write {} ({} bytes)",
                generator::parser_file_name(grammar.name()),
                generated.len()
            );
            continue;
        }

        match write_parser_file(&config.output_dir(), grammar.name(), &generated) {
            Ok(path) => info!("parser written to {}", path.display()),
            Err(err) => {
                io_failed = true;
                error!("failed to write parser for '{}': {err}", grammar.name());
            }
        }
    }

    if grammar_errors {
        exit::GRAMMAR_ERRORS
    } else if io_failed {
        exit::IO_ERROR
    } else if tests_failed {
        exit::TESTS_FAILED
    } else {
        exit::OK
    }
}
