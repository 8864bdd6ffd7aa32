//! Diagnostics for the Loom synthesis engine
//!
//! Every user-facing failure of the engine is surfaced as a `Diagnostic`:
//! - severity (Error, Warning, Info, Hint)
//! - a stable error code (`E7001`, ...)
//! - a message plus optional labels, notes and help lines
//! - a `SourceSpan` resolved through the shared `SourceMap`
//!
//! Diagnostics are plain data. Nothing in the engine panics or prints on a
//! user error; callers decide how to report them (see `ErrorFormatter`).

use std::fmt;

pub use source_map::{FileId, SourceFile, SourceMap, SourcePosition, SourceSpan};

pub mod syntax;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
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

/// Style for diagnostic labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    Primary,
    Secondary,
}

/// A label that points to a span of code
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub span: SourceSpan,
    pub message: String,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Primary,
        }
    }

    pub fn secondary(span: SourceSpan, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
            style: LabelStyle::Secondary,
        }
    }
}

/// A diagnostic message with severity, code, labels and notes
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
    pub span: SourceSpan,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub help: Vec<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }

    /// True when this diagnostic carries the given `E####` code
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.severity, code, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Append-only collection of diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
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

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
    }

    /// All diagnostics carrying the given code, in emission order
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics.iter().filter(move |d| d.has_code(code))
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            diagnostics: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

/// Builder for creating diagnostics
pub struct DiagnosticBuilder {
    diagnostic: Diagnostic,
}

impl DiagnosticBuilder {
    fn with_severity(
        severity: DiagnosticSeverity,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            diagnostic: Diagnostic {
                severity,
                code: None,
                message: message.into(),
                span,
                labels: Vec::new(),
                notes: Vec::new(),
                help: Vec::new(),
            },
        }
    }

    pub fn error(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: SourceSpan) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, message, span)
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.diagnostic.code = Some(code.into());
        self
    }

    pub fn label(mut self, span: SourceSpan, message: impl Into<String>) -> Self {
        self.diagnostic.labels.push(Label::primary(span, message));
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.diagnostic.notes.push(note.into());
        self
    }

    pub fn help(mut self, help_msg: impl Into<String>) -> Self {
        self.diagnostic.help.push(help_msg.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.diagnostic
    }
}

/// ANSI palette used by the formatter; empty strings when colors are off
struct Palette {
    severity: &'static str,
    accent: &'static str,
    emphasis: &'static str,
    help: &'static str,
    note: &'static str,
    reset: &'static str,
}

impl Palette {
    fn new(use_colors: bool, severity: DiagnosticSeverity) -> Self {
        if !use_colors {
            return Self {
                severity: "",
                accent: "",
                emphasis: "",
                help: "",
                note: "",
                reset: "",
            };
        }
        Self {
            severity: match severity {
                DiagnosticSeverity::Error => "\x1b[31m",
                DiagnosticSeverity::Warning => "\x1b[33m",
                DiagnosticSeverity::Info => "\x1b[36m",
                DiagnosticSeverity::Hint => "\x1b[32m",
            },
            accent: "\x1b[96m",
            emphasis: "\x1b[1;97m",
            help: "\x1b[32m",
            note: "\x1b[34m",
            reset: "\x1b[0m",
        }
    }
}

/// Formatter for displaying diagnostics with source snippets
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

    pub fn format_diagnostics(&self, diagnostics: &Diagnostics, source_map: &SourceMap) -> String {
        diagnostics
            .iter()
            .map(|d| self.format_diagnostic(d, source_map))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn format_diagnostic(&self, diagnostic: &Diagnostic, source_map: &SourceMap) -> String {
        let p = Palette::new(self.use_colors, diagnostic.severity);
        let mut output = String::new();

        output.push_str(p.severity);
        output.push_str(&diagnostic.severity.to_string());
        if let Some(code) = &diagnostic.code {
            output.push_str(&format!("[{}]", code));
        }
        output.push_str(&format!(
            "{}: {}{}{}\n",
            p.reset, p.emphasis, diagnostic.message, p.reset
        ));

        if let Some(file) = source_map.get_file(diagnostic.span.file_id) {
            let start = diagnostic.span.start;
            output.push_str(&format!(
                "  {}-->{} {}:{}:{}\n",
                p.accent, p.reset, file.name, start.line, start.column
            ));

            if let Some(line) = file.get_line(start.line) {
                let gutter = " ".repeat(start.line.to_string().len());
                let width = if diagnostic.span.end.line == start.line {
                    diagnostic.span.end.column.saturating_sub(start.column)
                } else {
                    line.len().saturating_sub(start.column.saturating_sub(1))
                };
                let primary = diagnostic
                    .labels
                    .iter()
                    .find(|l| l.style == LabelStyle::Primary)
                    .map(|l| format!(" {}", l.message))
                    .unwrap_or_default();

                output.push_str(&format!("{} {}|{}\n", gutter, p.accent, p.reset));
                output.push_str(&format!(
                    "{}{}{} {}|{} {}\n",
                    p.accent, start.line, p.reset, p.accent, p.reset, line
                ));
                output.push_str(&format!(
                    "{} {}|{} {}{}{}{}{}\n",
                    gutter,
                    p.accent,
                    p.reset,
                    " ".repeat(start.column.saturating_sub(1)),
                    p.severity,
                    "^".repeat(width.max(1)),
                    primary,
                    p.reset
                ));
            }
        }

        for label in diagnostic
            .labels
            .iter()
            .filter(|l| l.style == LabelStyle::Secondary)
        {
            if let Some(file) = source_map.get_file(label.span.file_id) {
                output.push_str(&format!(
                    "  {}-->{} {}:{}:{}: {}\n",
                    p.accent,
                    p.reset,
                    file.name,
                    label.span.start.line,
                    label.span.start.column,
                    label.message
                ));
            }
        }

        for help_msg in &diagnostic.help {
            output.push_str(&format!("     {}help{}: {}\n", p.help, p.reset, help_msg));
        }

        for note in &diagnostic.notes {
            output.push_str(&format!("{}note{}: {}\n", p.note, p.reset, note));
        }

        output
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type that carries diagnostics on failure
pub type DiagnosticResult<T> = Result<T, Diagnostics>;

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(file_id: FileId, line: usize, column: usize, len: usize) -> SourceSpan {
        SourceSpan::new(
            SourcePosition::new(line, column, 0),
            SourcePosition::new(line, column + len, len),
            file_id,
        )
    }

    #[test]
    fn test_diagnostic_builder() {
        let span = span_at(FileId::new(0), 1, 5, 1);

        let diagnostic = DiagnosticBuilder::error("ambiguous implicit", span.clone())
            .code("E2002")
            .label(span, "here")
            .help("remove one of the candidates")
            .note("candidates: a, b")
            .build();

        assert!(diagnostic.is_error());
        assert!(diagnostic.has_code("E2002"));
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.help.len(), 1);
        assert_eq!(diagnostic.notes.len(), 1);
        assert_eq!(diagnostic.to_string(), "error[E2002]: ambiguous implicit");
    }

    #[test]
    fn test_warnings_do_not_count_as_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(DiagnosticBuilder::warning("no branches", SourceSpan::unknown()).build());
        assert!(!diagnostics.has_errors());

        diagnostics.push(
            DiagnosticBuilder::error("boom", SourceSpan::unknown())
                .code("E9001")
                .build(),
        );
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.with_code("E9001").count(), 1);
    }

    #[test]
    fn test_formatter_renders_snippet() {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file(
            "Main.lm".to_string(),
            "class Main {\n    int x = greet;\n}".to_string(),
        );
        let span = span_at(file_id, 2, 13, 5);
        let diagnostic = DiagnosticBuilder::error("macro used as a value", span.clone())
            .code("E7001")
            .label(span, "not a call")
            .build();

        let text = ErrorFormatter::new().format_diagnostic(&diagnostic, &source_map);
        assert!(text.starts_with("error[E7001]: macro used as a value"));
        assert!(text.contains("--> Main.lm:2:13"));
        assert!(text.contains("    int x = greet;"));
        assert!(text.contains("^^^^^ not a call"));
    }
}
