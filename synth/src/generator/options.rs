//! Annotation configuration parsing
//!
//! `@record(hash: false, constructor: "factory")` style arguments are read
//! here. Only named arguments with literal values are accepted.

use super::registry::AnnotationKind;
use crate::errors::SynthError;
use diagnostics::SourceSpan;
use parser::{Annotation, Expr, ExprKind, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstructorMode {
    None,
    #[default]
    Constructor,
    /// `internal` constructor plus a public static `apply` factory
    Factory,
}

impl ConstructorMode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(ConstructorMode::None),
            "constructor" => Some(ConstructorMode::Constructor),
            "factory" => Some(ConstructorMode::Factory),
            _ => None,
        }
    }

    pub fn generates_constructor(self) -> bool {
        self != ConstructorMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOptions {
    pub to_string: bool,
    pub equality: bool,
    pub hash: bool,
    pub constructor: ConstructorMode,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            to_string: true,
            equality: true,
            hash: true,
            constructor: ConstructorMode::Constructor,
        }
    }
}

impl RecordOptions {
    pub fn from_annotation(annotation: &Annotation, span: SourceSpan) -> Result<Self, SynthError> {
        let mut options = Self::default();
        let malformed = |message: String| SynthError::MalformedConfig {
            annotation: AnnotationKind::Record.name().to_string(),
            message,
            span,
        };

        for arg in &annotation.args {
            let Some(key) = &arg.name else {
                return Err(malformed(
                    "positional arguments are not accepted; use key: value".to_string(),
                ));
            };
            match key.as_str() {
                "toString" => options.to_string = expect_bool(key, &arg.value).map_err(malformed)?,
                "equality" => options.equality = expect_bool(key, &arg.value).map_err(malformed)?,
                "hash" => options.hash = expect_bool(key, &arg.value).map_err(malformed)?,
                "constructor" => {
                    let value = expect_string(key, &arg.value).map_err(malformed)?;
                    options.constructor = ConstructorMode::parse(&value).ok_or_else(|| {
                        malformed(format!(
                            "constructor must be \"none\", \"constructor\" or \"factory\", found \"{}\"",
                            value
                        ))
                    })?;
                }
                other => return Err(malformed(format!("unknown key '{}'", other))),
            }
        }
        Ok(options)
    }
}

/// Annotations such as `@matcher` and `@singleton` take no configuration
pub fn expect_no_args(
    annotation: &Annotation,
    kind: AnnotationKind,
    span: SourceSpan,
) -> Result<(), SynthError> {
    if annotation.args.is_empty() {
        return Ok(());
    }
    Err(SynthError::MalformedConfig {
        annotation: kind.name().to_string(),
        message: format!("@{} takes no arguments", kind.name()),
        span,
    })
}

fn expect_bool(key: &str, value: &Expr) -> Result<bool, String> {
    match &value.kind {
        ExprKind::Literal(Literal::Bool(b)) => Ok(*b),
        _ => Err(format!("'{}' expects true or false", key)),
    }
}

fn expect_string(key: &str, value: &Expr) -> Result<String, String> {
    match &value.kind {
        ExprKind::Literal(Literal::String(s)) => Ok(s.clone()),
        _ => Err(format!("'{}' expects a string literal", key)),
    }
}
