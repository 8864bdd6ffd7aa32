//! Annotation dispatch registry
//!
//! Maps every recognized annotation name to a closed `AnnotationKind` and
//! every synthesis kind to its handler. The registry is built once per session
//! and looked up per annotation; adding a kind means adding a variant, which
//! the exhaustive matches below then force through every stage.

use super::context::GeneratorContext;
use super::scanner::Declaration;
use super::{matcher, record, singleton};
use crate::errors::SynthError;
use fxhash::FxHashMap;
use parser::Annotation;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationKind {
    Record,
    Matcher,
    Singleton,
    Pattern,
    StatementPattern,
    BindingPattern,
    Inline,
    Implicit,
    PassThrough,
}

/// Stage that owns an annotation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationRole {
    /// Consumed by the scanner on type declarations
    Synthesis,
    /// Consumed by the macro table on methods
    Macro,
    /// Consumed by the implicit solver on parameters, fields and methods
    Implicit,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 9] = [
        AnnotationKind::Record,
        AnnotationKind::Matcher,
        AnnotationKind::Singleton,
        AnnotationKind::Pattern,
        AnnotationKind::StatementPattern,
        AnnotationKind::BindingPattern,
        AnnotationKind::Inline,
        AnnotationKind::Implicit,
        AnnotationKind::PassThrough,
    ];

    /// Name as written after `@`
    pub fn name(self) -> &'static str {
        match self {
            AnnotationKind::Record => "record",
            AnnotationKind::Matcher => "matcher",
            AnnotationKind::Singleton => "singleton",
            AnnotationKind::Pattern => "pattern",
            AnnotationKind::StatementPattern => "statement_pattern",
            AnnotationKind::BindingPattern => "binding_pattern",
            AnnotationKind::Inline => "inline",
            AnnotationKind::Implicit => "implicit",
            AnnotationKind::PassThrough => "pass_through",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn role(self) -> AnnotationRole {
        match self {
            AnnotationKind::Record | AnnotationKind::Matcher | AnnotationKind::Singleton => {
                AnnotationRole::Synthesis
            }
            AnnotationKind::Pattern
            | AnnotationKind::StatementPattern
            | AnnotationKind::BindingPattern
            | AnnotationKind::Inline => AnnotationRole::Macro,
            AnnotationKind::Implicit | AnnotationKind::PassThrough => AnnotationRole::Implicit,
        }
    }

    pub fn is_macro(self) -> bool {
        self.role() == AnnotationRole::Macro
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// Synthesis handler: reads the annotation and the declaration, pushes
/// fragments into the context
pub type SynthesisHandler =
    fn(&Annotation, &mut GeneratorContext, &Declaration<'_>) -> Result<(), SynthError>;

/// Annotation kind -> synthesis handler
pub struct SynthesisRegistry {
    handlers: FxHashMap<AnnotationKind, SynthesisHandler>,
}

impl SynthesisRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: FxHashMap::default(),
        };
        for kind in AnnotationKind::ALL {
            let handler: Option<SynthesisHandler> = match kind {
                AnnotationKind::Record => Some(record::synthesize),
                AnnotationKind::Matcher => Some(matcher::synthesize),
                AnnotationKind::Singleton => Some(singleton::synthesize),
                AnnotationKind::Pattern
                | AnnotationKind::StatementPattern
                | AnnotationKind::BindingPattern
                | AnnotationKind::Inline
                | AnnotationKind::Implicit
                | AnnotationKind::PassThrough => None,
            };
            if let Some(handler) = handler {
                registry.handlers.insert(kind, handler);
            }
        }
        registry
    }

    pub fn handler(&self, kind: AnnotationKind) -> Option<SynthesisHandler> {
        self.handlers.get(&kind).copied()
    }

    /// Kind of a registered annotation; unknown names belong to other tools
    pub fn lookup(&self, annotation: &Annotation) -> Option<AnnotationKind> {
        AnnotationKind::from_name(&annotation.name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for SynthesisRegistry {
    fn default() -> Self {
        Self::new()
    }
}
