//! Per-unit accumulator for the synthesis pass
//!
//! Each rayon task owns one `GeneratorContext`; contexts are merged in unit
//! order once the pass is over, so nothing here needs locking.

use super::registry::AnnotationKind;
use super::scanner::Declaration;
use diagnostics::{Diagnostic, Diagnostics, SourceSpan};
use parser::{TypeConstraint, TypeDecl, TypeKind, TypeParam};

/// Kind, name and generic parameters of a type declaration, enough to reopen
/// it as `partial` in a generated unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclHeader {
    pub kind: TypeKind,
    pub name: String,
    pub type_params: Vec<TypeParam>,
}

impl DeclHeader {
    pub fn of(decl: &TypeDecl) -> Self {
        Self {
            kind: decl.kind,
            name: decl.name.clone(),
            type_params: decl.type_params.clone(),
        }
    }

    /// `partial class Box<T : class>`
    pub fn partial_header(&self) -> String {
        format!(
            "partial {} {}{}",
            self.kind.keyword(),
            self.name,
            render_type_params(&self.type_params, true)
        )
    }

    /// `Box<T>` as a type reference from inside the declaration
    pub fn self_type(&self) -> String {
        format!("{}{}", self.name, render_type_params(&self.type_params, false))
    }
}

/// `<T : class, U>`; empty when there are no parameters
pub fn render_type_params(params: &[TypeParam], constraints: bool) -> String {
    if params.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = params
        .iter()
        .map(|param| match (&param.constraint, constraints) {
            (Some(TypeConstraint::Class), true) => format!("{} : class", param.name),
            (Some(TypeConstraint::Struct), true) => format!("{} : struct", param.name),
            (Some(TypeConstraint::Type(ty)), true) => format!("{} : {}", param.name, ty),
            _ => param.name.clone(),
        })
        .collect();
    format!("<{}>", rendered.join(", "))
}

/// Members synthesized for one (declaration, annotation) pair
#[derive(Debug, Clone)]
pub struct SynthesizedFragment {
    /// Source unit the declaration lives in
    pub source: String,
    pub annotation: AnnotationKind,
    /// Qualified name of the target declaration
    pub qualified: String,
    pub namespace: Vec<String>,
    /// Enclosing types, outermost first
    pub ancestry: Vec<DeclHeader>,
    pub target: DeclHeader,
    /// Member source texts, in synthesis order
    pub members: Vec<String>,
    /// Declarations placed next to the target rather than inside it
    pub companions: Vec<String>,
    /// Location of the annotation that produced the fragment
    pub span: SourceSpan,
}

#[derive(Debug, Default)]
pub struct GeneratorContext {
    source: String,
    fragments: Vec<SynthesizedFragment>,
    macro_types: Vec<String>,
    diagnostics: Diagnostics,
}

impl GeneratorContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Record members synthesized for `decl` by `annotation`
    pub fn add_fragment(
        &mut self,
        decl: &Declaration<'_>,
        annotation: AnnotationKind,
        span: SourceSpan,
        members: Vec<String>,
        companions: Vec<String>,
    ) {
        log::trace!(
            "{} on {}: {} members, {} companions",
            annotation,
            decl.qualified,
            members.len(),
            companions.len()
        );
        self.fragments.push(SynthesizedFragment {
            source: self.source.clone(),
            annotation,
            qualified: decl.qualified.to_string(),
            namespace: decl.namespace.to_vec(),
            ancestry: decl.ancestry.to_vec(),
            target: DeclHeader::of(decl.decl),
            members,
            companions,
            span,
        });
    }

    /// Remember a type that declares macro methods
    pub fn mark_macro_type(&mut self, qualified: impl Into<String>) {
        let qualified = qualified.into();
        if !self.macro_types.contains(&qualified) {
            self.macro_types.push(qualified);
        }
    }

    pub fn report(&mut self, diagnostic: impl Into<Diagnostic>) {
        self.diagnostics.push(diagnostic.into());
    }

    pub fn fragments(&self) -> &[SynthesizedFragment] {
        &self.fragments
    }

    pub fn macro_types(&self) -> &[String] {
        &self.macro_types
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Append everything `other` collected after this context's results
    pub fn merge(&mut self, other: GeneratorContext) {
        self.fragments.extend(other.fragments);
        for qualified in other.macro_types {
            self.mark_macro_type(qualified);
        }
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn into_parts(self) -> (Vec<SynthesizedFragment>, Vec<String>, Diagnostics) {
        (self.fragments, self.macro_types, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::parse_unit;

    #[test]
    fn test_headers_render_constraints() {
        let unit = parse_unit("a.lm", "partial class Box<T : class, U> { }").unwrap();
        let parser::Item::Type(decl) = &unit.items[0] else {
            panic!("expected a type");
        };
        let header = DeclHeader::of(decl);
        assert_eq!(header.partial_header(), "partial class Box<T : class, U>");
        assert_eq!(header.self_type(), "Box<T, U>");
    }

    #[test]
    fn test_merge_keeps_unit_order_and_dedupes_macro_types() {
        let mut first = GeneratorContext::new("a.lm");
        first.mark_macro_type("App.Text");
        let mut second = GeneratorContext::new("b.lm");
        second.mark_macro_type("App.Text");
        second.mark_macro_type("App.Log");
        first.merge(second);
        assert_eq!(first.macro_types(), ["App.Text", "App.Log"]);
    }
}
