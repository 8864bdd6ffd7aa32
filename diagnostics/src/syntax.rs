//! Diagnostic builders for host-language syntax errors
//!
//! The parse service reports failures through these helpers so every syntax
//! error carries the same code and shape.

use crate::{Diagnostic, DiagnosticBuilder, SourceSpan};

/// Code shared by all parse failures
pub const PARSE_ERROR: &str = "E0001";

/// Code for input left over after a complete unit was parsed
pub const TRAILING_INPUT: &str = "E0002";

/// Common syntax diagnostic builders
pub struct SyntaxDiagnostics;

impl SyntaxDiagnostics {
    /// Parse failure with the innermost parser context as explanation
    pub fn parse_failure(span: SourceSpan, context: Option<&str>, found: &str) -> Diagnostic {
        let found = if found.is_empty() {
            "end of input".to_string()
        } else {
            format!("'{}'", found)
        };
        let mut builder = DiagnosticBuilder::error(format!("unexpected {}", found), span.clone())
            .code(PARSE_ERROR)
            .label(span, "parsing stopped here");
        if let Some(context) = context {
            builder = builder.help(context.to_string());
        }
        builder.build()
    }

    /// Input that is not a declaration where a declaration was expected
    pub fn trailing_input(span: SourceSpan, found: &str) -> Diagnostic {
        DiagnosticBuilder::error(
            format!("expected a namespace or type declaration, found '{}'", found),
            span.clone(),
        )
        .code(TRAILING_INPUT)
        .label(span, "not a declaration")
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_mentions_context() {
        let diagnostic =
            SyntaxDiagnostics::parse_failure(SourceSpan::unknown(), Some("expected ';'"), "}");
        assert!(diagnostic.has_code(PARSE_ERROR));
        assert_eq!(diagnostic.message, "unexpected '}'");
        assert_eq!(diagnostic.help, vec!["expected ';'".to_string()]);
    }

    #[test]
    fn test_parse_failure_at_end_of_input() {
        let diagnostic = SyntaxDiagnostics::parse_failure(SourceSpan::unknown(), None, "");
        assert_eq!(diagnostic.message, "unexpected end of input");
        assert!(diagnostic.help.is_empty());
    }
}
