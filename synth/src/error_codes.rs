//! Error code registry for the synthesis engine
//!
//! Every diagnostic the engine emits carries one of the codes below. Codes
//! are grouped by range so a code alone tells which stage produced it.
//!
//! # Error Code Ranges
//!
//! - E0001-E0999: Syntax errors reported by the parse service
//! - E2000-E2999: Implicit resolution errors
//! - E6000-E6999: Annotation and synthesis errors
//! - E7000-E7999: Macro errors
//! - E9000-E9999: Internal consistency errors

use fxhash::FxHashMap;
use std::fmt;

pub const PARSE_ERROR: u16 = 1;
pub const TRAILING_INPUT: u16 = 2;

pub const HIDDEN_IMPLICIT: u16 = 2001;
pub const AMBIGUOUS_IMPLICIT: u16 = 2002;
pub const MISSING_IMPLICIT: u16 = 2003;
pub const CYCLIC_PASS_THROUGH: u16 = 2004;

pub const MALFORMED_ANNOTATION_CONFIG: u16 = 6001;
pub const UNSUPPORTED_DECLARATION_SHAPE: u16 = 6002;
pub const DUPLICATE_GENERATED_ARTIFACT: u16 = 6003;
pub const EMPTY_MATCHER: u16 = 6004;

pub const UNRESOLVED_MACRO_REFERENCE: u16 = 7001;
pub const UNSUPPORTED_MACRO_POSITION: u16 = 7002;
pub const INVALID_MACRO_EXPANSION: u16 = 7003;
pub const UNSUPPORTED_DEFAULT_VALUE: u16 = 7004;

pub const UNREPLACED_EDIT: u16 = 9001;
pub const GENERATED_CODE_PARSE_FAILURE: u16 = 9002;
pub const SESSION_SETUP_FAILURE: u16 = 9003;

/// Error code with its stable slug and human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// The numeric error code (e.g., 2003)
    pub code: u16,
    /// Stable kebab-case name (e.g., "missing-implicit")
    pub slug: &'static str,
    /// Error category
    pub category: &'static str,
    /// Brief description of what this error means
    pub description: &'static str,
    /// Optional help text with suggestions for fixing the error
    pub help: Option<&'static str>,
}

impl ErrorCode {
    pub const fn new(
        code: u16,
        slug: &'static str,
        category: &'static str,
        description: &'static str,
        help: Option<&'static str>,
    ) -> Self {
        Self {
            code,
            slug,
            category,
            description,
            help,
        }
    }

    /// Format the error code as "E{code:04}" (e.g., "E2003")
    pub fn format_code(&self) -> String {
        format_error_code(self.code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]: {}",
            self.format_code(),
            self.slug,
            self.category,
            self.description
        )
    }
}

/// Registry containing all defined error codes
pub struct ErrorCodeRegistry {
    codes: FxHashMap<u16, ErrorCode>,
}

impl ErrorCodeRegistry {
    /// Create a new registry with all predefined error codes
    pub fn new() -> Self {
        let mut registry = Self {
            codes: FxHashMap::default(),
        };
        registry.register_all_codes();
        registry
    }

    pub fn get(&self, code: u16) -> Option<&ErrorCode> {
        self.codes.get(&code)
    }

    /// Get an error code by its formatted string (e.g., "E2003")
    pub fn get_by_string(&self, code_str: &str) -> Option<&ErrorCode> {
        parse_error_code(code_str).and_then(|code| self.get(code))
    }

    /// Get an error code by its slug (e.g., "missing-implicit")
    pub fn get_by_slug(&self, slug: &str) -> Option<&ErrorCode> {
        self.codes.values().find(|code| code.slug == slug)
    }

    fn register(&mut self, error_code: ErrorCode) {
        self.codes.insert(error_code.code, error_code);
    }

    fn register_all_codes(&mut self) {
        // ===== SYNTAX (E0001-E0999) =====
        self.register(ErrorCode::new(
            PARSE_ERROR,
            "parse-error",
            "Syntax",
            "Source text could not be parsed",
            Some("Check for missing punctuation or keywords"),
        ));
        self.register(ErrorCode::new(
            TRAILING_INPUT,
            "parse-error",
            "Syntax",
            "Unexpected input after the last declaration",
            Some("Only namespaces and type declarations may appear at the top level"),
        ));

        // ===== IMPLICIT RESOLUTION (E2000-E2999) =====
        self.register(ErrorCode::new(
            HIDDEN_IMPLICIT,
            "hidden-implicit",
            "Resolution",
            "An implicit candidate is shadowed by a non-implicit symbol",
            Some("Rename the shadowing symbol or mark it @implicit"),
        ));
        self.register(ErrorCode::new(
            AMBIGUOUS_IMPLICIT,
            "ambiguous-implicit",
            "Resolution",
            "More than one implicit candidate matches the parameter type",
            Some("Pass the argument explicitly or remove one of the candidates"),
        ));
        self.register(ErrorCode::new(
            MISSING_IMPLICIT,
            "missing-implicit",
            "Resolution",
            "No implicit candidate matches the parameter type",
            Some("Declare an @implicit parameter, field or property of this type in scope"),
        ));
        self.register(ErrorCode::new(
            CYCLIC_PASS_THROUGH,
            "cyclic-pass-through",
            "Resolution",
            "Pass-through methods forward implicits to each other in a cycle",
            Some("Break the cycle by declaring the implicit parameter explicitly on one method"),
        ));

        // ===== ANNOTATIONS AND SYNTHESIS (E6000-E6999) =====
        self.register(ErrorCode::new(
            MALFORMED_ANNOTATION_CONFIG,
            "malformed-annotation-config",
            "Annotation",
            "Annotation arguments are not valid for this annotation",
            None,
        ));
        self.register(ErrorCode::new(
            UNSUPPORTED_DECLARATION_SHAPE,
            "unsupported-declaration-shape",
            "Annotation",
            "The annotation cannot be applied to this declaration",
            Some("Types receiving synthesized members must be declared partial"),
        ));
        self.register(ErrorCode::new(
            DUPLICATE_GENERATED_ARTIFACT,
            "duplicate-generated-artifact",
            "Annotation",
            "Two synthesized fragments map to the same generated artifact",
            Some("Annotate only one partial declaration of the type"),
        ));
        self.register(ErrorCode::new(
            EMPTY_MATCHER,
            "empty-matcher",
            "Annotation",
            "No subtypes of the matcher type are declared in the same unit",
            None,
        ));

        // ===== MACROS (E7000-E7999) =====
        self.register(ErrorCode::new(
            UNRESOLVED_MACRO_REFERENCE,
            "unresolved-macro-reference",
            "Macro",
            "A macro method is referenced without being invoked",
            Some("Macro methods only exist at their call sites and cannot be used as values"),
        ));
        self.register(ErrorCode::new(
            UNSUPPORTED_MACRO_POSITION,
            "unsupported-macro-position",
            "Macro",
            "The macro is invoked where its expansion cannot be placed",
            None,
        ));
        self.register(ErrorCode::new(
            INVALID_MACRO_EXPANSION,
            "invalid-macro-expansion",
            "Macro",
            "The macro template did not expand to valid source",
            None,
        ));
        self.register(ErrorCode::new(
            UNSUPPORTED_DEFAULT_VALUE,
            "unsupported-default-value",
            "Macro",
            "An omitted argument's default value cannot be rendered into the expansion",
            Some("Use a literal, a cast or a default expression as the parameter default"),
        ));

        // ===== INTERNAL (E9000-E9999) =====
        self.register(ErrorCode::new(
            UNREPLACED_EDIT,
            "unreplaced-edit",
            "Internal",
            "A scheduled edit did not land in the rewritten tree",
            Some("This is an internal error; please report it with the input units"),
        ));
        self.register(ErrorCode::new(
            GENERATED_CODE_PARSE_FAILURE,
            "generated-code-parse-failure",
            "Internal",
            "Synthesized source text could not be parsed",
            Some("This is an internal error; please report it with the input units"),
        ));
        self.register(ErrorCode::new(
            SESSION_SETUP_FAILURE,
            "session-setup-failure",
            "Internal",
            "The synthesis session could not be set up",
            None,
        ));
    }

    /// Get all error codes in a specific range, sorted
    pub fn get_range(&self, start: u16, end: u16) -> Vec<&ErrorCode> {
        let mut codes: Vec<&ErrorCode> = self
            .codes
            .values()
            .filter(|code| code.code >= start && code.code <= end)
            .collect();
        codes.sort_by_key(|code| code.code);
        codes
    }

    pub fn is_valid_code(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static REGISTRY: std::sync::OnceLock<ErrorCodeRegistry> = std::sync::OnceLock::new();

/// Get the global error code registry
pub fn error_registry() -> &'static ErrorCodeRegistry {
    REGISTRY.get_or_init(ErrorCodeRegistry::new)
}

/// Helper function to format error code string (e.g., 2003 -> "E2003")
pub fn format_error_code(code: u16) -> String {
    format!("E{:04}", code)
}

/// Helper function to parse error code from string (e.g., "E2003" -> Some(2003))
pub fn parse_error_code(code_str: &str) -> Option<u16> {
    code_str.strip_prefix('E')?.parse::<u16>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ErrorCodeRegistry::new();
        let missing = registry.get(MISSING_IMPLICIT).unwrap();
        assert_eq!(missing.slug, "missing-implicit");
        assert_eq!(missing.format_code(), "E2003");

        let by_string = registry.get_by_string("E7003").unwrap();
        assert_eq!(by_string.slug, "invalid-macro-expansion");

        let by_slug = registry.get_by_slug("cyclic-pass-through").unwrap();
        assert_eq!(by_slug.code, CYCLIC_PASS_THROUGH);

        assert!(registry.get(65535).is_none());
        assert!(registry.get_by_string("INVALID").is_none());
    }

    #[test]
    fn test_ranges_are_disjoint() {
        let registry = error_registry();
        let implicit = registry.get_range(2000, 2999);
        assert_eq!(implicit.len(), 4);
        assert!(implicit.windows(2).all(|w| w[0].code < w[1].code));
        assert_eq!(registry.get_range(7000, 7999).len(), 4);
    }

    #[test]
    fn test_helper_functions() {
        assert_eq!(format_error_code(9001), "E9001");
        assert_eq!(format_error_code(1), "E0001");
        assert_eq!(parse_error_code("E0002"), Some(2));
        assert_eq!(parse_error_code("2002"), None);
    }

    #[test]
    fn test_syntax_codes_match_parser() {
        assert_eq!(format_error_code(PARSE_ERROR), diagnostics::syntax::PARSE_ERROR);
        assert_eq!(
            format_error_code(TRAILING_INPUT),
            diagnostics::syntax::TRAILING_INPUT
        );
    }
}
