//! Macro table
//!
//! Methods annotated `@pattern`, `@statement_pattern`, `@binding_pattern` or
//! `@inline` are collected from every unit of the working set into one table
//! keyed by `MethodId`. The table is built once per session, after synthesis,
//! and only read afterwards.

pub mod expand;
pub mod template;

use crate::errors::MacroError;
use crate::generator::{AnnotationKind, AnnotationRole};
use crate::program::ProgramUnit;
use crate::semantic::{MethodId, SymbolTable};
use diagnostics::{Diagnostics, SourceMap, SourceSpan};
use fxhash::FxHashMap;
use parser::{Annotation, ExprKind, Item, Literal, Member, MethodDecl, TypeDecl};

pub use expand::{
    bind_arguments, expand_expression, expand_statements, inline_function, BoundVariable,
    Invocation,
};
pub use template::substitute;

/// Expansion strategy of a macro method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    /// Template expanding to one expression
    Pattern(String),
    /// Template expanding to statements in place of an expression statement
    StatementPattern(String),
    /// Template expanding to statements in place of a one-variable declaration
    BindingPattern(String),
    /// Body spliced as a local function
    Inline,
}

impl MacroKind {
    pub fn annotation(&self) -> AnnotationKind {
        match self {
            MacroKind::Pattern(_) => AnnotationKind::Pattern,
            MacroKind::StatementPattern(_) => AnnotationKind::StatementPattern,
            MacroKind::BindingPattern(_) => AnnotationKind::BindingPattern,
            MacroKind::Inline => AnnotationKind::Inline,
        }
    }

    pub fn template(&self) -> Option<&str> {
        match self {
            MacroKind::Pattern(t) | MacroKind::StatementPattern(t) | MacroKind::BindingPattern(t) => {
                Some(t)
            }
            MacroKind::Inline => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MacroDefinition {
    pub method: MethodId,
    pub name: String,
    pub kind: MacroKind,
    /// Declaration as written; params, defaults and the inline body
    pub decl: MethodDecl,
    pub span: SourceSpan,
}

#[derive(Debug, Default)]
pub struct MacroTable {
    definitions: FxHashMap<MethodId, MacroDefinition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: MacroDefinition) {
        self.definitions.insert(definition.method, definition);
    }

    pub fn get(&self, method: MethodId) -> Option<&MacroDefinition> {
        self.definitions.get(&method)
    }

    pub fn is_macro(&self, method: MethodId) -> bool {
        self.definitions.contains_key(&method)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<MacroDefinition> for MacroTable {
    fn from_iter<I: IntoIterator<Item = MacroDefinition>>(iter: I) -> Self {
        let mut table = MacroTable::new();
        for definition in iter {
            table.insert(definition);
        }
        table
    }
}

/// Collect the macro definitions declared in the unit at `index`
pub fn collect_definitions(
    index: usize,
    unit: &ProgramUnit,
    table: &SymbolTable,
    source_map: &SourceMap,
) -> (Vec<MacroDefinition>, Diagnostics) {
    let mut definitions = Vec::new();
    let mut diagnostics = Diagnostics::new();
    let mut stack: Vec<&TypeDecl> = Vec::new();
    push_items(&unit.unit.items, &mut stack);

    while let Some(decl) = stack.pop() {
        for member in decl.members.iter().rev() {
            match member {
                Member::Method(method) => {
                    let Some(id) = table.method_at(index, method.id) else {
                        continue;
                    };
                    let span = unit.source_span(source_map, method.span);
                    match definition(id, method, span, |a| unit.source_span(source_map, a.span)) {
                        Ok(Some(definition)) => definitions.push(definition),
                        Ok(None) => {}
                        Err(error) => diagnostics.push(error.into()),
                    }
                }
                Member::Type(nested) => stack.push(nested),
                _ => {}
            }
        }
    }

    // the stack walks members back to front
    definitions.reverse();
    log::debug!("{}: {} macro definitions", unit.path, definitions.len());
    (definitions, diagnostics)
}

fn push_items<'u>(items: &'u [Item], stack: &mut Vec<&'u TypeDecl>) {
    for item in items.iter().rev() {
        match item {
            Item::Namespace(ns) => push_items(&ns.items, stack),
            Item::Type(decl) => stack.push(decl),
        }
    }
}

/// Validate one method's macro annotation; `None` when it has none
fn definition(
    id: MethodId,
    method: &MethodDecl,
    span: SourceSpan,
    annotation_span: impl Fn(&Annotation) -> SourceSpan,
) -> Result<Option<MacroDefinition>, MacroError> {
    let mut found = method.annotations.iter().filter_map(|a| {
        AnnotationKind::from_name(&a.name)
            .filter(|k| k.role() == AnnotationRole::Macro)
            .map(|k| (k, a))
    });
    let Some((kind, annotation)) = found.next() else {
        return Ok(None);
    };
    let at = annotation_span(annotation);
    if let Some((second, _)) = found.next() {
        return Err(MacroError::MalformedDefinition {
            name: method.name.clone(),
            message: format!("{} conflicts with {}", second, kind),
            span: at,
        });
    }

    let kind = match kind {
        AnnotationKind::Pattern => MacroKind::Pattern(template_argument(method, kind, annotation, at)?),
        AnnotationKind::StatementPattern => {
            MacroKind::StatementPattern(template_argument(method, kind, annotation, at)?)
        }
        AnnotationKind::BindingPattern => {
            MacroKind::BindingPattern(template_argument(method, kind, annotation, at)?)
        }
        AnnotationKind::Inline => {
            if !annotation.args.is_empty() {
                return Err(MacroError::MalformedDefinition {
                    name: method.name.clone(),
                    message: "@inline takes no arguments".to_string(),
                    span: at,
                });
            }
            if !method.is_static() {
                return Err(MacroError::UnsupportedDefinition {
                    name: method.name.clone(),
                    message: "only static methods can be inlined".to_string(),
                    span: at,
                });
            }
            if method.body.is_none() {
                return Err(MacroError::UnsupportedDefinition {
                    name: method.name.clone(),
                    message: "an inline macro needs a body".to_string(),
                    span: at,
                });
            }
            MacroKind::Inline
        }
        AnnotationKind::Record
        | AnnotationKind::Matcher
        | AnnotationKind::Singleton
        | AnnotationKind::Implicit
        | AnnotationKind::PassThrough => return Ok(None),
    };

    Ok(Some(MacroDefinition {
        method: id,
        name: method.name.clone(),
        kind,
        decl: method.clone(),
        span,
    }))
}

fn template_argument(
    method: &MethodDecl,
    kind: AnnotationKind,
    annotation: &Annotation,
    span: SourceSpan,
) -> Result<String, MacroError> {
    let malformed = |message: String| MacroError::MalformedDefinition {
        name: method.name.clone(),
        message,
        span,
    };
    if annotation.args.len() != 1 || annotation.args[0].name.is_some() {
        return Err(malformed(format!(
            "{} takes exactly one positional template string",
            kind
        )));
    }
    match &annotation.args[0].value.kind {
        ExprKind::Literal(Literal::String(template)) if !template.trim().is_empty() => {
            Ok(template.clone())
        }
        ExprKind::Literal(Literal::String(_)) => Err(malformed("the template is empty".to_string())),
        _ => Err(malformed("the template must be a string literal".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::UnitOrigin;
    use diagnostics::FileId;
    use parser::parse_unit;

    fn collect(source: &str) -> (Vec<MacroDefinition>, Diagnostics) {
        let unit = ProgramUnit {
            path: "m.lm".to_string(),
            file_id: FileId::new(0),
            unit: parse_unit("m.lm", source).expect("unit should parse"),
            origin: UnitOrigin::Source,
        };
        let table = SymbolTable::build([&unit.unit]);
        collect_definitions(0, &unit, &table, &SourceMap::new())
    }

    #[test]
    fn test_collects_every_kind() {
        let (definitions, diagnostics) = collect(
            r#"
            class Text {
                @pattern("\"Hello, ${name}!\"")
                static string greet(string name);
                @statement_pattern("Console.log(${msg});")
                static void log(string msg);
                @inline
                static int twice(int x) { return x * 2; }
                void plain() { }
            }
            "#,
        );
        assert!(diagnostics.is_empty());
        let kinds: Vec<AnnotationKind> = definitions.iter().map(|d| d.kind.annotation()).collect();
        assert_eq!(
            kinds,
            vec![
                AnnotationKind::Pattern,
                AnnotationKind::StatementPattern,
                AnnotationKind::Inline
            ]
        );
        assert_eq!(definitions[0].kind.template(), Some("\"Hello, ${name}!\""));
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let (definitions, diagnostics) = collect(
            r#"
            class Text {
                @pattern
                static string a();
                @inline
                int b() { return 1; }
                @pattern("x") @inline
                static int c() { return 1; }
            }
            "#,
        );
        assert!(definitions.is_empty());
        assert_eq!(diagnostics.with_code("E6001").count(), 2);
        assert_eq!(diagnostics.with_code("E6002").count(), 1);
    }
}
