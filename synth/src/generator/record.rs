//! `@record` synthesis
//!
//! Derives construction, printing, hashing, equality and copy members from a
//! declaration's instance fields and auto-properties, in declaration order.

use super::context::{render_type_params, DeclHeader, GeneratorContext};
use super::options::{ConstructorMode, RecordOptions};
use super::registry::AnnotationKind;
use super::scanner::Declaration;
use crate::errors::SynthError;
use crate::semantic::{classify, enumerable_element, MethodKind, ValueClass};
use parser::{Annotation, TypeKind, TypeRef};

/// One instance member taking part in the record
#[derive(Debug, Clone)]
pub struct RecordMember {
    pub name: String,
    pub ty: TypeRef,
    pub class: ValueClass,
    /// Has an initializer, so it is left out of the constructor
    pub initialized: bool,
}

impl RecordMember {
    /// Can be left out of `copy` with `null` meaning "keep the current value"
    fn admits_absent_sentinel(&self) -> bool {
        match self.class {
            ValueClass::NullableValue => false,
            ValueClass::TypeParam { class_constrained } => class_constrained,
            _ => true,
        }
    }

    /// Parameter type in `copy`: value types are lifted to `T?`
    fn optional_type(&self) -> TypeRef {
        if self.class.is_value_type() {
            self.ty.to_nullable()
        } else {
            self.ty.clone()
        }
    }
}

pub fn synthesize(
    annotation: &Annotation,
    context: &mut GeneratorContext,
    decl: &Declaration<'_>,
) -> Result<(), SynthError> {
    let span = decl.annotation_span;
    if !matches!(decl.decl.kind, TypeKind::Class | TypeKind::Struct) || decl.decl.is_static() {
        return Err(SynthError::UnsupportedShape {
            annotation: AnnotationKind::Record.name().to_string(),
            message: format!(
                "records must be non-static classes or structs, '{}' is a {}",
                decl.decl.name,
                decl.decl.kind.keyword()
            ),
            span,
        });
    }

    let options = RecordOptions::from_annotation(annotation, span)?;
    let members = record_members(decl);
    let header = DeclHeader::of(decl.decl);
    let ctor_params: Vec<&RecordMember> = members.iter().filter(|m| !m.initialized).collect();

    if options.constructor.generates_constructor() && has_constructor_like(decl, &ctor_params) {
        return Err(SynthError::UnsupportedShape {
            annotation: AnnotationKind::Record.name().to_string(),
            message: format!(
                "'{}' already declares a constructor with the record's parameters",
                decl.decl.name
            ),
            span,
        });
    }

    let mut out = Vec::new();
    let mut companions = Vec::new();

    if options.constructor.generates_constructor() {
        out.push(constructor(&header, options.constructor, &ctor_params));
    }
    if options.to_string {
        out.push(to_string(&header, &members));
    }
    if options.hash {
        out.push(hash_code(&members));
    }
    if options.equality {
        out.extend(equality(&header, decl.decl.kind, &members));
    }
    if options.constructor.generates_constructor() {
        out.extend(with_copies(&header, &ctor_params));
        if let Some(copy) = copy(&header, &ctor_params) {
            out.push(copy);
        }
    }
    if options.constructor == ConstructorMode::Factory {
        let factory = factory(&header, &ctor_params);
        if header.type_params.is_empty() {
            out.push(factory);
        } else {
            companions.push(format!(
                "public static class {} {{\n{}\n}}",
                header.name, factory
            ));
        }
    }
    if options.to_string && members.iter().any(|m| enumerable_element(&m.ty).is_some()) {
        out.push(JOIN_TO_STRING.to_string());
    }

    context.add_fragment(decl, AnnotationKind::Record, span, out, companions);
    Ok(())
}

/// Instance fields and auto-properties of every partial part of the type,
/// in declaration order
pub fn record_members(decl: &Declaration<'_>) -> Vec<RecordMember> {
    decl.table
        .type_info(decl.type_id)
        .fields
        .iter()
        .filter(|field| !field.is_static)
        .map(|field| RecordMember {
            name: field.name.clone(),
            class: classify(decl.table, &field.ty, Some(decl.type_id)),
            ty: field.ty.clone(),
            initialized: field.initialized,
        })
        .collect()
}

fn has_constructor_like(decl: &Declaration<'_>, params: &[&RecordMember]) -> bool {
    decl.table
        .type_info(decl.type_id)
        .methods
        .iter()
        .map(|&id| decl.table.method(id))
        .any(|method| {
            method.kind == MethodKind::Constructor
                && method.params.len() == params.len()
                && method.params.iter().zip(params).all(|(p, m)| p.ty == m.ty)
        })
}

fn param_list(params: &[&RecordMember]) -> String {
    params
        .iter()
        .map(|m| format!("{} {}", m.ty, m.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn constructor(header: &DeclHeader, mode: ConstructorMode, params: &[&RecordMember]) -> String {
    let access = match mode {
        ConstructorMode::Factory => "internal",
        _ => "public",
    };
    let mut text = format!("{} {}({}) {{\n", access, header.name, param_list(params));
    for member in params {
        text.push_str(&format!("    this.{0} = {0};\n", member.name));
    }
    text.push('}');
    text
}

fn to_string(header: &DeclHeader, members: &[RecordMember]) -> String {
    if members.is_empty() {
        return format!(
            "public override string toString() => \"{}()\";",
            header.name
        );
    }
    let mut parts = Vec::new();
    for (i, member) in members.iter().enumerate() {
        let label = if i == 0 {
            format!("\"{}({}: \"", header.name, member.name)
        } else {
            format!("\", {}: \"", member.name)
        };
        parts.push(label);
        if enumerable_element(&member.ty).is_some() {
            parts.push(format!("joinToString({})", member.name));
        } else {
            parts.push(member.name.clone());
        }
    }
    parts.push("\")\"".to_string());
    format!("public override string toString() => {};", parts.join(" + "))
}

/// Hash contribution of one member
pub fn member_hash(member: &RecordMember) -> String {
    let access = format!("this.{}", member.name);
    match member.class {
        ValueClass::Integral { wide: false } => format!("(int){}", access),
        ValueClass::Integral { wide: true } => format!("{}.hashCode()", access),
        ValueClass::Bool => format!("({} ? 1 : 0)", access),
        ValueClass::Enum { wide: true } => format!("((long){}).hashCode()", access),
        ValueClass::Enum { wide: false } => format!("(int){}", access),
        ValueClass::Value | ValueClass::NullableValue => format!("{}.hashCode()", access),
        ValueClass::Reference | ValueClass::TypeParam { .. } => {
            format!("({0} == null ? 0 : {0}.hashCode())", access)
        }
    }
}

fn hash_code(members: &[RecordMember]) -> String {
    let mut text = String::from("public override int hashCode() {\n    int hash = 0;\n");
    for member in members {
        text.push_str(&format!(
            "    hash = (hash * 397) ^ {};\n",
            member_hash(member)
        ));
    }
    text.push_str("    return hash;\n}");
    text
}

fn equality(header: &DeclHeader, kind: TypeKind, members: &[RecordMember]) -> Vec<String> {
    let self_type = header.self_type();
    let mut typed = format!("public bool equals({} other) {{\n", self_type);
    if kind == TypeKind::Class {
        typed.push_str("    if (other == null) {\n        return false;\n    }\n");
        typed.push_str("    if (Equality.reference(this, other)) {\n        return true;\n    }\n");
    }
    let comparisons: Vec<String> = members
        .iter()
        .map(|member| {
            if member.class.is_value_type() {
                format!("this.{0} == other.{0}", member.name)
            } else {
                format!("Equality.same(this.{0}, other.{0})", member.name)
            }
        })
        .collect();
    if comparisons.is_empty() {
        typed.push_str("    return true;\n}");
    } else {
        typed.push_str(&format!("    return {};\n}}", comparisons.join(" && ")));
    }

    let untyped = format!(
        "public override bool equals(object obj) => obj is {} other && equals(other);",
        self_type
    );
    vec![typed, untyped]
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn with_copies(header: &DeclHeader, params: &[&RecordMember]) -> Vec<String> {
    let self_type = header.self_type();
    params
        .iter()
        .map(|target| {
            let args: Vec<String> = params
                .iter()
                .map(|p| {
                    if p.name == target.name {
                        p.name.clone()
                    } else {
                        format!("this.{}", p.name)
                    }
                })
                .collect();
            format!(
                "public {0} with{1}({2} {3}) => new {0}({4});",
                self_type,
                capitalize(&target.name),
                target.ty,
                target.name,
                args.join(", ")
            )
        })
        .collect()
}

fn copy(header: &DeclHeader, params: &[&RecordMember]) -> Option<String> {
    let eligible: Vec<&&RecordMember> = params.iter().filter(|m| m.admits_absent_sentinel()).collect();
    if eligible.is_empty() {
        return None;
    }
    let self_type = header.self_type();
    let signature: Vec<String> = eligible
        .iter()
        .map(|m| format!("{} {} = null", m.optional_type(), m.name))
        .collect();
    let args: Vec<String> = params
        .iter()
        .map(|m| {
            if m.admits_absent_sentinel() {
                format!("{0} ?? this.{0}", m.name)
            } else {
                format!("this.{}", m.name)
            }
        })
        .collect();
    Some(format!(
        "public {0} copy({1}) => new {0}({2});",
        self_type,
        signature.join(", "),
        args.join(", ")
    ))
}

fn factory(header: &DeclHeader, params: &[&RecordMember]) -> String {
    let args: Vec<&str> = params.iter().map(|m| m.name.as_str()).collect();
    format!(
        "public static {0} apply{1}({2}) => new {0}({3});",
        header.self_type(),
        render_type_params(&header.type_params, true),
        param_list(params),
        args.join(", ")
    )
}

const JOIN_TO_STRING: &str = r#"private static string joinToString<TItem>(IEnumerable<TItem> items) {
    if (items == null) {
        return "null";
    }
    string text = "[";
    bool first = true;
    foreach (TItem item in items) {
        if (!first) {
            text += ", ";
        }
        if (item is IEnumerable<object> nested) {
            text += joinToString(nested);
        } else {
            text += "" + item;
        }
        first = false;
    }
    return text + "]";
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, ty: &str, class: ValueClass) -> RecordMember {
        RecordMember {
            name: name.to_string(),
            ty: parser::parse_type(ty).unwrap(),
            class,
            initialized: false,
        }
    }

    #[test]
    fn test_member_hash_shapes() {
        assert_eq!(
            member_hash(&member("x", "int", ValueClass::Integral { wide: false })),
            "(int)this.x"
        );
        assert_eq!(
            member_hash(&member("big", "long", ValueClass::Integral { wide: true })),
            "this.big.hashCode()"
        );
        assert_eq!(member_hash(&member("on", "bool", ValueClass::Bool)), "(this.on ? 1 : 0)");
        assert_eq!(
            member_hash(&member("c", "Big", ValueClass::Enum { wide: true })),
            "((long)this.c).hashCode()"
        );
        assert_eq!(
            member_hash(&member("name", "string", ValueClass::Reference)),
            "(this.name == null ? 0 : this.name.hashCode())"
        );
    }

    #[test]
    fn test_copy_sentinels() {
        let header = DeclHeader {
            kind: TypeKind::Class,
            name: "Item".to_string(),
            type_params: Vec::new(),
        };
        let count = member("count", "int", ValueClass::Integral { wide: false });
        let maybe = member("maybe", "int?", ValueClass::NullableValue);
        let label = member("label", "string", ValueClass::Reference);
        let copy = copy(&header, &[&count, &maybe, &label]).unwrap();
        assert_eq!(
            copy,
            "public Item copy(int? count = null, string label = null) => \
             new Item(count ?? this.count, this.maybe, label ?? this.label);"
        );
        assert!(super::copy(&header, &[&maybe]).is_none());
    }

    #[test]
    fn test_to_string_labels() {
        let header = DeclHeader {
            kind: TypeKind::Struct,
            name: "Point".to_string(),
            type_params: Vec::new(),
        };
        let x = member("x", "int", ValueClass::Integral { wide: false });
        let tags = member("tags", "List<string>", ValueClass::Reference);
        assert_eq!(
            to_string(&header, &[x, tags]),
            "public override string toString() => \"Point(x: \" + x + \", tags: \" + joinToString(tags) + \")\";"
        );
        assert_eq!(
            to_string(&header, &[]),
            "public override string toString() => \"Point()\";"
        );
    }
}
