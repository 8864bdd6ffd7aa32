//! `@matcher` synthesis
//!
//! Adds `match` and `map<TResult>` to a base type, with one branch per direct
//! subtype declared in the same unit. Both end in a `throw` for variants
//! declared elsewhere.

use super::context::GeneratorContext;
use super::options::expect_no_args;
use super::registry::AnnotationKind;
use super::scanner::Declaration;
use crate::error_codes::{format_error_code, EMPTY_MATCHER};
use crate::errors::SynthError;
use crate::semantic::TypeId;
use diagnostics::DiagnosticBuilder;
use parser::{Annotation, TypeKind};

/// Runtime type tested by one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    /// Type as written in the `is` test
    pub ty: String,
    /// Handler parameter name
    pub param: String,
}

pub fn synthesize(
    annotation: &Annotation,
    context: &mut GeneratorContext,
    decl: &Declaration<'_>,
) -> Result<(), SynthError> {
    let span = decl.annotation_span;
    expect_no_args(annotation, AnnotationKind::Matcher, span)?;
    if !matches!(decl.decl.kind, TypeKind::Class | TypeKind::Interface) {
        return Err(SynthError::UnsupportedShape {
            annotation: AnnotationKind::Matcher.name().to_string(),
            message: format!(
                "matchers need a base class or interface, '{}' is a {}",
                decl.decl.name,
                decl.decl.kind.keyword()
            ),
            span,
        });
    }

    let branches = branches(decl);
    if branches.is_empty() {
        context.report(
            DiagnosticBuilder::warning(
                format!(
                    "@matcher on '{}' found no subtypes in this unit; nothing was generated",
                    decl.decl.name
                ),
                span,
            )
            .code(format_error_code(EMPTY_MATCHER))
            .build(),
        );
        return Ok(());
    }

    let base = decl.decl.name.as_str();
    let members = vec![match_method(base, &branches), map_method(base, &branches)];
    context.add_fragment(decl, AnnotationKind::Matcher, span, members, Vec::new());
    Ok(())
}

/// Direct subtypes in document order; a concrete annotated class comes last
pub fn branches(decl: &Declaration<'_>) -> Vec<Branch> {
    let table = decl.table;
    let mut subtypes: Vec<TypeId> = Vec::new();
    for &id in decl.unit_types {
        if id != decl.type_id
            && !subtypes.contains(&id)
            && table.direct_supertypes(id).contains(&decl.type_id)
        {
            subtypes.push(id);
        }
    }

    let is_concrete = decl.decl.kind == TypeKind::Class
        && !table.type_info(decl.type_id).is_abstract;
    if is_concrete {
        subtypes.push(decl.type_id);
    }

    let mut branches: Vec<Branch> = Vec::new();
    for id in subtypes {
        let info = table.type_info(id);
        let mut param = lower_first(&info.name);
        if branches.iter().any(|b| b.param == param) {
            param = format!("{}{}", param, branches.len());
        }
        branches.push(Branch {
            ty: table.self_type_ref(id).to_string(),
            param,
        });
    }
    branches
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn unhandled(base: &str) -> String {
    format!(
        "    throw new InvalidOperationException(\"Unhandled {} variant\");\n",
        base
    )
}

fn match_method(base: &str, branches: &[Branch]) -> String {
    let params: Vec<String> = branches
        .iter()
        .map(|b| format!("Action<{}> {}", b.ty, b.param))
        .collect();
    let mut text = format!("public void match({}) {{\n", params.join(", "));
    for branch in branches {
        text.push_str(&format!(
            "    if (this is {0} {1}Case) {{\n        {1}({1}Case);\n        return;\n    }}\n",
            branch.ty, branch.param
        ));
    }
    text.push_str(&unhandled(base));
    text.push('}');
    text
}

fn map_method(base: &str, branches: &[Branch]) -> String {
    let params: Vec<String> = branches
        .iter()
        .map(|b| format!("Func<{}, TResult> {}", b.ty, b.param))
        .collect();
    let mut text = format!("public TResult map<TResult>({}) {{\n", params.join(", "));
    for branch in branches {
        text.push_str(&format!(
            "    if (this is {0} {1}Case) {{\n        return {1}({1}Case);\n    }}\n",
            branch.ty, branch.param
        ));
    }
    text.push_str(&unhandled(base));
    text.push('}');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Vec<Branch> {
        vec![
            Branch {
                ty: "Circle".to_string(),
                param: "circle".to_string(),
            },
            Branch {
                ty: "Square".to_string(),
                param: "square".to_string(),
            },
        ]
    }

    #[test]
    fn test_match_returns_after_each_branch() {
        let text = match_method("Shape", &shapes());
        assert!(text.starts_with("public void match(Action<Circle> circle, Action<Square> square)"));
        assert_eq!(text.matches("return;").count(), 2);
        assert_eq!(text.matches("throw new InvalidOperationException").count(), 1);
    }

    #[test]
    fn test_map_returns_each_branch_result() {
        let text = map_method("Shape", &shapes());
        assert!(text.contains("return circle(circleCase);"));
        assert!(text.contains("return square(squareCase);"));
        assert!(text.trim_end().ends_with('}'));
    }
}
