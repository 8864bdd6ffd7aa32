//! `@singleton` synthesis

use super::context::{DeclHeader, GeneratorContext};
use super::options::expect_no_args;
use super::registry::AnnotationKind;
use super::scanner::Declaration;
use crate::errors::SynthError;
use parser::{Annotation, Member, TypeKind};

pub fn synthesize(
    annotation: &Annotation,
    context: &mut GeneratorContext,
    decl: &Declaration<'_>,
) -> Result<(), SynthError> {
    let span = decl.annotation_span;
    expect_no_args(annotation, AnnotationKind::Singleton, span)?;

    let unsupported = |message: String| SynthError::UnsupportedShape {
        annotation: AnnotationKind::Singleton.name().to_string(),
        message,
        span,
    };
    if decl.decl.kind != TypeKind::Class {
        return Err(unsupported(format!(
            "singletons must be classes, '{}' is a {}",
            decl.decl.name,
            decl.decl.kind.keyword()
        )));
    }
    if decl.decl.is_static() || decl.table.type_info(decl.type_id).is_abstract {
        return Err(unsupported(format!(
            "'{}' cannot be instantiated",
            decl.decl.name
        )));
    }
    if decl
        .decl
        .members
        .iter()
        .any(|m| matches!(m, Member::Constructor(_)))
    {
        return Err(unsupported(format!(
            "'{}' declares its own constructor",
            decl.decl.name
        )));
    }

    let header = DeclHeader::of(decl.decl);
    let members = vec![
        format!("private {}() {{\n}}", header.name),
        format!(
            "public static {0} instance {{ get; }} = new {0}();",
            header.self_type()
        ),
    ];
    context.add_fragment(decl, AnnotationKind::Singleton, span, members, Vec::new());
    Ok(())
}
