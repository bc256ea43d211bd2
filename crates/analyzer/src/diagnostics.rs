//! Checker diagnostics.

use std::fmt;

/// How serious a finding is. Only `Error` blocks code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Style and hygiene advice.
    Advice,
    /// Probably a mistake, but generation can proceed.
    Warning,
    /// The grammar is invalid; nothing will be emitted.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advice => write!(f, "advice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One checker finding, positioned at a grammar source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    line: usize,
}

impl Diagnostic {
    pub fn new(severity: Severity, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            line,
        }
    }

    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, line, message)
    }

    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, line, message)
    }

    pub fn advice(line: usize, message: impl Into<String>) -> Self {
        Self::new(Severity::Advice, line, message)
    }

    #[must_use]
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}): {}", self.severity, self.line, self.message)
    }
}
