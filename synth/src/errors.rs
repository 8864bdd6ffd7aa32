//! Error types for synthesis, macro expansion and implicit resolution
//!
//! Stages return these typed errors internally and convert them to
//! `Diagnostic`s at the granularity of one annotation, one call site or one
//! edit, so a single failure never hides the rest.

use crate::error_codes::*;
use diagnostics::{Diagnostic, DiagnosticBuilder, SourceSpan};
use std::fmt;

// =============================================================================
// Synthesis Errors
// =============================================================================

/// Errors raised while scanning annotations, synthesizing fragments or
/// committing rewritten units
#[derive(Debug, Clone)]
pub enum SynthError {
    /// Annotation arguments do not fit the annotation's configuration
    MalformedConfig {
        annotation: String,
        message: String,
        span: SourceSpan,
    },

    /// The annotated declaration cannot receive the synthesized members
    UnsupportedShape {
        annotation: String,
        message: String,
        span: SourceSpan,
    },

    /// Two fragments claim the same generated artifact path
    DuplicateArtifact {
        path: String,
        first_source: String,
        span: SourceSpan,
    },

    /// Synthesized text did not parse
    GeneratedParse {
        path: String,
        message: String,
        span: SourceSpan,
    },

    /// A scheduled edit was never applied
    UnreplacedEdit {
        unit: String,
        description: String,
        span: SourceSpan,
    },

    /// The dedicated thread pool could not be built
    ThreadPool { message: String },
}

impl SynthError {
    pub fn span(&self) -> SourceSpan {
        match self {
            SynthError::MalformedConfig { span, .. }
            | SynthError::UnsupportedShape { span, .. }
            | SynthError::DuplicateArtifact { span, .. }
            | SynthError::GeneratedParse { span, .. }
            | SynthError::UnreplacedEdit { span, .. } => *span,
            SynthError::ThreadPool { .. } => SourceSpan::unknown(),
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            SynthError::MalformedConfig { .. } => MALFORMED_ANNOTATION_CONFIG,
            SynthError::UnsupportedShape { .. } => UNSUPPORTED_DECLARATION_SHAPE,
            SynthError::DuplicateArtifact { .. } => DUPLICATE_GENERATED_ARTIFACT,
            SynthError::GeneratedParse { .. } => GENERATED_CODE_PARSE_FAILURE,
            SynthError::UnreplacedEdit { .. } => UNREPLACED_EDIT,
            SynthError::ThreadPool { .. } => SESSION_SETUP_FAILURE,
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            SynthError::DuplicateArtifact { first_source, .. } => Some(format!(
                "the artifact was already produced from '{}'",
                first_source
            )),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        build_diagnostic(self.to_string(), self.span(), self.error_code(), self.suggestion())
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::MalformedConfig {
                annotation,
                message,
                ..
            } => write!(f, "malformed @{} configuration: {}", annotation, message),
            SynthError::UnsupportedShape {
                annotation,
                message,
                ..
            } => write!(f, "@{} cannot be applied here: {}", annotation, message),
            SynthError::DuplicateArtifact { path, .. } => {
                write!(f, "generated artifact '{}' is produced twice", path)
            }
            SynthError::GeneratedParse { path, message, .. } => {
                write!(f, "synthesized unit '{}' does not parse: {}", path, message)
            }
            SynthError::UnreplacedEdit {
                unit, description, ..
            } => write!(f, "edit in '{}' was never applied: {}", unit, description),
            SynthError::ThreadPool { message } => {
                write!(f, "failed to build synthesis thread pool: {}", message)
            }
        }
    }
}

impl std::error::Error for SynthError {}

impl From<SynthError> for Diagnostic {
    fn from(error: SynthError) -> Self {
        error.to_diagnostic()
    }
}

// =============================================================================
// Macro Errors
// =============================================================================

/// Errors raised while building the macro table or expanding invocations
#[derive(Debug, Clone)]
pub enum MacroError {
    /// The macro annotation's arguments are unusable
    MalformedDefinition {
        name: String,
        message: String,
        span: SourceSpan,
    },

    /// The annotated method cannot be a macro of this kind
    UnsupportedDefinition {
        name: String,
        message: String,
        span: SourceSpan,
    },

    /// A macro method is used as a value instead of being invoked
    UnresolvedReference { name: String, span: SourceSpan },

    /// The invocation sits where the expansion cannot be placed
    UnsupportedPosition {
        name: String,
        reason: String,
        span: SourceSpan,
    },

    /// The template expanded to something that is not valid source
    InvalidExpansion {
        name: String,
        reason: String,
        span: SourceSpan,
    },

    /// An omitted argument's default cannot be rendered
    UnsupportedDefault {
        name: String,
        param: String,
        span: SourceSpan,
    },
}

impl MacroError {
    pub fn span(&self) -> SourceSpan {
        match self {
            MacroError::MalformedDefinition { span, .. }
            | MacroError::UnsupportedDefinition { span, .. }
            | MacroError::UnresolvedReference { span, .. }
            | MacroError::UnsupportedPosition { span, .. }
            | MacroError::InvalidExpansion { span, .. }
            | MacroError::UnsupportedDefault { span, .. } => *span,
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            MacroError::MalformedDefinition { .. } => MALFORMED_ANNOTATION_CONFIG,
            MacroError::UnsupportedDefinition { .. } => UNSUPPORTED_DECLARATION_SHAPE,
            MacroError::UnresolvedReference { .. } => UNRESOLVED_MACRO_REFERENCE,
            MacroError::UnsupportedPosition { .. } => UNSUPPORTED_MACRO_POSITION,
            MacroError::InvalidExpansion { .. } => INVALID_MACRO_EXPANSION,
            MacroError::UnsupportedDefault { .. } => UNSUPPORTED_DEFAULT_VALUE,
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            MacroError::UnresolvedReference { name, .. } => {
                Some(format!("call '{}' directly instead of referring to it", name))
            }
            MacroError::UnsupportedDefault { param, .. } => Some(format!(
                "pass '{}' explicitly or give it a literal default",
                param
            )),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        build_diagnostic(self.to_string(), self.span(), self.error_code(), self.suggestion())
    }
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroError::MalformedDefinition { name, message, .. } => {
                write!(f, "malformed macro '{}': {}", name, message)
            }
            MacroError::UnsupportedDefinition { name, message, .. } => {
                write!(f, "'{}' cannot be a macro: {}", name, message)
            }
            MacroError::UnresolvedReference { name, .. } => {
                write!(f, "macro '{}' is referenced but not invoked", name)
            }
            MacroError::UnsupportedPosition { name, reason, .. } => {
                write!(f, "macro '{}' cannot be expanded here: {}", name, reason)
            }
            MacroError::InvalidExpansion { name, reason, .. } => {
                write!(f, "invalid expansion of macro '{}': {}", name, reason)
            }
            MacroError::UnsupportedDefault { name, param, .. } => write!(
                f,
                "default value of parameter '{}' of macro '{}' cannot be expanded",
                param, name
            ),
        }
    }
}

impl std::error::Error for MacroError {}

impl From<MacroError> for Diagnostic {
    fn from(error: MacroError) -> Self {
        error.to_diagnostic()
    }
}

// =============================================================================
// Resolution Errors
// =============================================================================

/// Errors raised by the implicit resolution solver
#[derive(Debug, Clone)]
pub enum ResolveError {
    /// An implicit candidate is shadowed by a non-implicit symbol
    Hidden {
        name: String,
        shadowed_by: String,
        method: String,
        span: SourceSpan,
    },

    /// Several candidates match one slot
    Ambiguous {
        param: String,
        ty: String,
        candidates: Vec<String>,
        span: SourceSpan,
    },

    /// No candidate matches a slot
    Missing {
        param: String,
        ty: String,
        callee: String,
        span: SourceSpan,
    },

    /// Pass-through methods forward to each other in a cycle
    Cyclic { path: Vec<String>, span: SourceSpan },
}

impl ResolveError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ResolveError::Hidden { span, .. }
            | ResolveError::Ambiguous { span, .. }
            | ResolveError::Missing { span, .. }
            | ResolveError::Cyclic { span, .. } => *span,
        }
    }

    pub fn error_code(&self) -> u16 {
        match self {
            ResolveError::Hidden { .. } => HIDDEN_IMPLICIT,
            ResolveError::Ambiguous { .. } => AMBIGUOUS_IMPLICIT,
            ResolveError::Missing { .. } => MISSING_IMPLICIT,
            ResolveError::Cyclic { .. } => CYCLIC_PASS_THROUGH,
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ResolveError::Ambiguous { param, .. } => {
                Some(format!("pass '{}' explicitly to choose one", param))
            }
            ResolveError::Missing { ty, .. } => Some(format!(
                "declare an @implicit parameter, field or property of type '{}'",
                ty
            )),
            _ => None,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        build_diagnostic(self.to_string(), self.span(), self.error_code(), self.suggestion())
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Hidden {
                name,
                shadowed_by,
                method,
                ..
            } => write!(
                f,
                "implicit '{}' is hidden by {} in '{}'",
                name, shadowed_by, method
            ),
            ResolveError::Ambiguous {
                param,
                ty,
                candidates,
                ..
            } => write!(
                f,
                "ambiguous implicit for parameter '{}' of type '{}': candidates {}",
                param,
                ty,
                candidates.join(", ")
            ),
            ResolveError::Missing {
                param, ty, callee, ..
            } => write!(
                f,
                "no implicit of type '{}' in scope for parameter '{}' of '{}'",
                ty, param, callee
            ),
            ResolveError::Cyclic { path, .. } => {
                write!(f, "cyclic pass-through: {}", path.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ResolveError {}

impl From<ResolveError> for Diagnostic {
    fn from(error: ResolveError) -> Self {
        error.to_diagnostic()
    }
}

fn build_diagnostic(
    message: String,
    span: SourceSpan,
    code: u16,
    suggestion: Option<String>,
) -> Diagnostic {
    let mut builder = DiagnosticBuilder::error(message, span).code(format_error_code(code));
    if let Some(help) = suggestion {
        builder = builder.help(help);
    } else if let Some(help) = error_registry().get(code).and_then(|c| c.help) {
        builder = builder.help(help);
    }
    builder.build()
}
