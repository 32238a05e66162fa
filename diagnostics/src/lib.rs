//! Diagnostics library for analysis reporting
//!
//! Analyses never abort on a single malformed instruction. Instead they push a
//! diagnostic here and keep going. This crate provides:
//! - Multiple severity levels (Error, Warning, Info, Hint)
//! - Stable diagnostic codes
//! - Program-point locations (function, block, instruction index)
//! - Notes and help text
//! - Plain or colored terminal output

use serde::Serialize;
use std::fmt;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Info => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

/// A point in the analyzed program: an instruction inside a basic block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramPoint {
    pub function: String,
    pub block: u32,
    pub instruction: usize,
}

impl ProgramPoint {
    pub fn new(function: impl Into<String>, block: u32, instruction: usize) -> Self {
        Self {
            function: function.into(),
            block,
            instruction,
        }
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} bb{}:{}", self.function, self.block, self.instruction)
    }
}

/// A diagnostic message with severity, location and follow-up text
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub location: Option<ProgramPoint>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

/// Collection of diagnostics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// Diagnostics carrying the given code, in emission order.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.code.as_deref() == Some(code))
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    severity: DiagnosticSeverity,
    code: Option<String>,
    message: String,
    location: Option<ProgramPoint>,
    notes: Vec<String>,
    help: Vec<String>,
}

impl DiagnosticBuilder {
    fn with_severity(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            code: None,
            message: message.into(),
            location: None,
            notes: vec![],
            help: vec![],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Info, message)
    }

    pub fn hint(message: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Hint, message)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn at(mut self, location: ProgramPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn help(mut self, help_msg: impl Into<String>) -> Self {
        self.help.push(help_msg.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            severity: self.severity,
            code: self.code,
            message: self.message,
            location: self.location,
            notes: self.notes,
            help: self.help,
        }
    }
}

/// Formatter for displaying diagnostics
pub struct ErrorFormatter {
    use_colors: bool,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self { use_colors: false }
    }

    pub fn with_colors() -> Self {
        Self { use_colors: true }
    }

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics) -> String {
        let mut output = String::new();

        for (i, diagnostic) in diagnostics.diagnostics.iter().enumerate() {
            if i > 0 {
                output.push('\n');
            }
            output.push_str(&self.format_diagnostic(diagnostic));
        }

        output
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        // Header
        if self.use_colors {
            let color = match diagnostic.severity {
                DiagnosticSeverity::Error => "\x1b[31m",
                DiagnosticSeverity::Warning => "\x1b[33m",
                DiagnosticSeverity::Info => "\x1b[36m",
                DiagnosticSeverity::Hint => "\x1b[32m",
            };
            output.push_str(color);
            output.push_str(&format!("{}", diagnostic.severity));
            if let Some(code) = &diagnostic.code {
                output.push_str(&format!("[{}]", code));
            }
            output.push_str("\x1b[0m: \x1b[1;97m");
            output.push_str(&diagnostic.message);
            output.push_str("\x1b[0m\n");
        } else {
            output.push_str(&format!("{}", diagnostic.severity));
            if let Some(code) = &diagnostic.code {
                output.push_str(&format!("[{}]", code));
            }
            output.push_str(&format!(": {}\n", diagnostic.message));
        }

        if let Some(location) = &diagnostic.location {
            if self.use_colors {
                output.push_str(&format!("  \x1b[96m-->\x1b[0m {}\n", location));
            } else {
                output.push_str(&format!("  --> {}\n", location));
            }
        }

        for help_msg in &diagnostic.help {
            if self.use_colors {
                output.push_str("     \x1b[32mhelp\x1b[0m: \x1b[33m");
                output.push_str(help_msg);
                output.push_str("\x1b[0m\n");
            } else {
                output.push_str("     help: ");
                output.push_str(help_msg);
                output.push('\n');
            }
        }

        for note in &diagnostic.notes {
            if self.use_colors {
                output.push_str("\x1b[34mnote\x1b[0m: ");
            } else {
                output.push_str("note: ");
            }
            output.push_str(note);
            output.push('\n');
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

// Dataflow-specific diagnostics
pub mod dataflow;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builder() {
        let diagnostic = DiagnosticBuilder::warning("test warning")
            .code("W0001")
            .at(ProgramPoint::new("main", 1, 3))
            .help("try this")
            .note("additional info")
            .build();

        assert_eq!(diagnostic.severity, DiagnosticSeverity::Warning);
        assert_eq!(diagnostic.code, Some("W0001".to_string()));
        assert_eq!(diagnostic.message, "test warning");
        assert_eq!(diagnostic.help.len(), 1);
        assert_eq!(diagnostic.notes.len(), 1);
    }

    #[test]
    fn test_plain_formatting() {
        let diagnostic = DiagnosticBuilder::error("bad cfg")
            .code("E0001")
            .at(ProgramPoint::new("f", 2, 0))
            .note("seen here")
            .build();

        let text = ErrorFormatter::new().format_diagnostic(&diagnostic);
        assert_eq!(text, "error[E0001]: bad cfg\n  --> @f bb2:0\nnote: seen here\n");
    }

    #[test]
    fn test_colored_formatting() {
        let diagnostic = DiagnosticBuilder::warning("index unknown")
            .code("W0102")
            .at(ProgramPoint::new("f", 1, 4))
            .build();

        let text = ErrorFormatter::with_colors().format_diagnostic(&diagnostic);
        assert!(text.starts_with("\x1b[33mwarning[W0102]\x1b[0m: "));
        assert!(text.contains("index unknown"));
        assert!(text.contains("\x1b[96m-->\x1b[0m @f bb1:4"));
    }

    #[test]
    fn test_collection_filters() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::warning("a").code("W1").build());
        diagnostics.push(DiagnosticBuilder::error("b").code("E1").build());
        diagnostics.push(DiagnosticBuilder::warning("c").code("W1").build());

        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().count(), 2);
        assert_eq!(diagnostics.with_code("W1").count(), 2);
    }
}
