//! Declaration scanner
//!
//! Walks one unit's declaration tree, pairs each declaration with the
//! registered annotations written on it and dispatches synthesis kinds to
//! their handlers. Annotations in the wrong place are reported here; macro
//! and implicit kinds on methods, fields and parameters are left to the
//! macro table and the implicit solver.

use super::context::{DeclHeader, GeneratorContext};
use super::registry::{AnnotationKind, AnnotationRole, SynthesisRegistry};
use crate::errors::SynthError;
use crate::program::ProgramUnit;
use crate::semantic::{SymbolTable, TypeId};
use diagnostics::{SourceMap, SourceSpan};
use parser::{Annotation, Item, Member, Param, TypeDecl};

/// A type declaration as seen by a synthesis handler
pub struct Declaration<'a> {
    pub decl: &'a TypeDecl,
    pub type_id: TypeId,
    pub qualified: &'a str,
    pub namespace: &'a [String],
    /// Enclosing types, outermost first
    pub ancestry: &'a [DeclHeader],
    /// Every type declared in the same unit, in document order
    pub unit_types: &'a [TypeId],
    pub table: &'a SymbolTable,
    /// Location of the declaration
    pub span: SourceSpan,
    /// Location of the annotation being dispatched
    pub annotation_span: SourceSpan,
}

struct Scanner<'a> {
    index: usize,
    unit: &'a ProgramUnit,
    table: &'a SymbolTable,
    registry: &'a SynthesisRegistry,
    source_map: &'a SourceMap,
    unit_types: Vec<TypeId>,
    namespace: Vec<String>,
    ancestry: Vec<DeclHeader>,
    /// Type whose members are being scanned
    current: Option<TypeId>,
    context: GeneratorContext,
}

/// Scan the unit at working-set position `index`
pub fn scan_unit(
    index: usize,
    unit: &ProgramUnit,
    table: &SymbolTable,
    registry: &SynthesisRegistry,
    source_map: &SourceMap,
) -> GeneratorContext {
    let mut unit_types = Vec::new();
    collect_types(index, table, &unit.unit.items, &mut unit_types);

    let mut scanner = Scanner {
        index,
        unit,
        table,
        registry,
        source_map,
        unit_types,
        namespace: Vec::new(),
        ancestry: Vec::new(),
        current: None,
        context: GeneratorContext::new(unit.path.clone()),
    };
    scanner.items(&unit.unit.items);
    log::debug!(
        "scanned {}: {} fragments, {} diagnostics",
        unit.path,
        scanner.context.fragments().len(),
        scanner.context.diagnostics().len()
    );
    scanner.context
}

fn collect_types(index: usize, table: &SymbolTable, items: &[Item], out: &mut Vec<TypeId>) {
    fn visit(index: usize, table: &SymbolTable, decl: &TypeDecl, out: &mut Vec<TypeId>) {
        if let Some(id) = table.type_at(index, decl.id) {
            out.push(id);
        }
        for member in &decl.members {
            if let Member::Type(nested) = member {
                visit(index, table, nested, out);
            }
        }
    }

    for item in items {
        match item {
            Item::Namespace(ns) => collect_types(index, table, &ns.items, out),
            Item::Type(decl) => visit(index, table, decl, out),
        }
    }
}

impl<'a> Scanner<'a> {
    fn span(&self, span: parser::Span) -> SourceSpan {
        self.unit.source_span(self.source_map, span)
    }

    fn items(&mut self, items: &'a [Item]) {
        for item in items {
            match item {
                Item::Namespace(ns) => {
                    let depth = self.namespace.len();
                    self.namespace.extend(ns.path.iter().cloned());
                    self.items(&ns.items);
                    self.namespace.truncate(depth);
                }
                Item::Type(decl) => self.type_decl(decl),
            }
        }
    }

    fn type_decl(&mut self, decl: &'a TypeDecl) {
        let Some(type_id) = self.table.type_at(self.index, decl.id) else {
            log::warn!("{} is missing from the symbol table", decl.name);
            return;
        };

        for annotation in &decl.annotations {
            let Some(kind) = self.registry.lookup(annotation) else {
                continue;
            };
            if kind.role() != AnnotationRole::Synthesis {
                self.misplaced(annotation, kind, "it applies to methods, fields or parameters");
                continue;
            }
            self.dispatch(annotation, kind, decl, type_id);
        }

        let outer = self.current.replace(type_id);
        for member in &decl.members {
            self.member(member);
        }

        self.ancestry.push(DeclHeader::of(decl));
        for member in &decl.members {
            if let Member::Type(nested) = member {
                self.type_decl(nested);
            }
        }
        self.ancestry.pop();
        self.current = outer;
    }

    fn dispatch(
        &mut self,
        annotation: &Annotation,
        kind: AnnotationKind,
        decl: &'a TypeDecl,
        type_id: TypeId,
    ) {
        let span = self.span(annotation.span);
        if !decl.is_partial() {
            self.context.report(SynthError::UnsupportedShape {
                annotation: kind.name().to_string(),
                message: format!("'{}' must be declared partial", decl.name),
                span,
            });
            return;
        }
        let Some(handler) = self.registry.handler(kind) else {
            return;
        };

        let qualified = self.table.type_info(type_id).qualified.clone();
        let declaration = Declaration {
            decl,
            type_id,
            qualified: &qualified,
            namespace: &self.namespace,
            ancestry: &self.ancestry,
            unit_types: &self.unit_types,
            table: self.table,
            span: self.span(decl.span),
            annotation_span: span,
        };
        if let Err(error) = handler(annotation, &mut self.context, &declaration) {
            log::debug!("{} on {} failed: {}", kind, qualified, error);
            self.context.report(error);
        }
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Method(method) => {
                for annotation in &method.annotations {
                    let Some(kind) = self.registry.lookup(annotation) else {
                        continue;
                    };
                    match kind.role() {
                        AnnotationRole::Macro => {
                            if let Some(owner) = self.current_qualified() {
                                self.context.mark_macro_type(owner);
                            }
                        }
                        AnnotationRole::Implicit if kind == AnnotationKind::PassThrough => {}
                        AnnotationRole::Implicit => {
                            self.misplaced(annotation, kind, "it applies to parameters, fields and properties")
                        }
                        AnnotationRole::Synthesis => {
                            self.misplaced(annotation, kind, "it applies to type declarations")
                        }
                    }
                }
                self.params(&method.params);
            }
            Member::Constructor(ctor) => {
                for annotation in &ctor.annotations {
                    if let Some(kind) = self.registry.lookup(annotation) {
                        self.misplaced(annotation, kind, "constructors take no annotations");
                    }
                }
                self.params(&ctor.params);
            }
            Member::Field(_) | Member::Property(_) => {
                for annotation in member.annotations() {
                    match self.registry.lookup(annotation) {
                        Some(AnnotationKind::Implicit) | None => {}
                        Some(kind) => self.misplaced(annotation, kind, "fields and properties only take @implicit"),
                    }
                }
            }
            Member::Type(_) => {}
        }
    }

    fn params(&mut self, params: &[Param]) {
        for param in params {
            for annotation in &param.annotations {
                match self.registry.lookup(annotation) {
                    Some(AnnotationKind::Implicit) | None => {}
                    Some(kind) => self.misplaced(annotation, kind, "parameters only take @implicit"),
                }
            }
        }
    }

    fn current_qualified(&self) -> Option<String> {
        self.current.map(|id| self.table.type_info(id).qualified.clone())
    }

    fn misplaced(&mut self, annotation: &Annotation, kind: AnnotationKind, message: &str) {
        let span = self.span(annotation.span);
        self.context.report(SynthError::UnsupportedShape {
            annotation: kind.name().to_string(),
            message: message.to_string(),
            span,
        });
    }
}
