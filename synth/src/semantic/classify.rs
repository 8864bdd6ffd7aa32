//! Value/reference classification of member types
//!
//! Record synthesis picks hash, equality and copy shapes by what a member's
//! type is: an integral primitive, a bool, an enum of 32- or 64-bit storage,
//! another value type, a reference, or a generic parameter.

use super::{SymbolTable, TypeId};
use parser::{TypeConstraint, TypeKind, TypeRef};

const INTEGRAL: &[&str] = &["sbyte", "byte", "short", "ushort", "int", "uint", "char"];
const WIDE_INTEGRAL: &[&str] = &["long", "ulong"];
const OTHER_VALUE: &[&str] = &["float", "double", "decimal"];

const ENUMERABLES: &[&str] = &[
    "List",
    "IEnumerable",
    "IList",
    "ICollection",
    "HashSet",
    "IReadOnlyList",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// `int`, `char`, ...; `wide` for `long` and `ulong`
    Integral { wide: bool },
    Bool,
    /// Enum; `wide` when backed by 64-bit storage
    Enum { wide: bool },
    /// Any other value type: floats, structs, `struct`-constrained parameters
    Value,
    /// `T?` over a value type
    NullableValue,
    /// Classes, interfaces, strings, arrays and unknown types
    Reference,
    /// Generic parameter; `class_constrained` when declared `T : class`
    TypeParam { class_constrained: bool },
}

impl ValueClass {
    pub fn is_value_type(self) -> bool {
        matches!(
            self,
            ValueClass::Integral { .. }
                | ValueClass::Bool
                | ValueClass::Enum { .. }
                | ValueClass::Value
                | ValueClass::NullableValue
        )
    }
}

/// Classify `ty` as written inside `context`
pub fn classify(table: &SymbolTable, ty: &TypeRef, context: Option<TypeId>) -> ValueClass {
    if ty.array_rank > 0 {
        return ValueClass::Reference;
    }

    let base = classify_non_nullable(table, ty, context);
    if ty.nullable {
        return if base.is_value_type() {
            ValueClass::NullableValue
        } else {
            base
        };
    }
    base
}

fn classify_non_nullable(table: &SymbolTable, ty: &TypeRef, context: Option<TypeId>) -> ValueClass {
    let name = ty.name.as_str();
    if ty.args.is_empty() {
        if INTEGRAL.contains(&name) {
            return ValueClass::Integral { wide: false };
        }
        if WIDE_INTEGRAL.contains(&name) {
            return ValueClass::Integral { wide: true };
        }
        if name == "bool" {
            return ValueClass::Bool;
        }
        if OTHER_VALUE.contains(&name) {
            return ValueClass::Value;
        }
        if name == "string" || name == "object" {
            return ValueClass::Reference;
        }
        if let Some(param) = table.type_param_in(name, context) {
            return match &param.constraint {
                Some(TypeConstraint::Class) => ValueClass::TypeParam {
                    class_constrained: true,
                },
                Some(TypeConstraint::Struct) => ValueClass::Value,
                _ => ValueClass::TypeParam {
                    class_constrained: false,
                },
            };
        }
    }

    match table.resolve_type(ty, context) {
        Some(id) => {
            let info = table.type_info(id);
            match info.kind {
                TypeKind::Enum => {
                    let wide = info
                        .enum_underlying()
                        .map(|u| WIDE_INTEGRAL.contains(&u.name.as_str()))
                        .unwrap_or(false);
                    ValueClass::Enum { wide }
                }
                TypeKind::Struct => ValueClass::Value,
                TypeKind::Class | TypeKind::Interface => ValueClass::Reference,
            }
        }
        None => ValueClass::Reference,
    }
}

/// Element type when `ty` is an enumerable rendered element by element:
/// arrays and the well-known collection interfaces, never `string`
pub fn enumerable_element(ty: &TypeRef) -> Option<TypeRef> {
    if ty.array_rank > 0 {
        return Some(TypeRef {
            array_rank: ty.array_rank - 1,
            nullable: false,
            ..ty.clone()
        });
    }
    if ty.args.len() == 1 && ENUMERABLES.contains(&ty.simple_name()) {
        return Some(ty.args[0].clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::{parse_type, parse_unit};

    fn ty(text: &str) -> TypeRef {
        parse_type(text).expect("type should parse")
    }

    #[test]
    fn test_primitive_classes() {
        let table = SymbolTable::default();
        assert_eq!(
            classify(&table, &ty("int"), None),
            ValueClass::Integral { wide: false }
        );
        assert_eq!(
            classify(&table, &ty("long"), None),
            ValueClass::Integral { wide: true }
        );
        assert_eq!(
            classify(&table, &ty("ulong"), None),
            ValueClass::Integral { wide: true }
        );
        assert_eq!(classify(&table, &ty("bool"), None), ValueClass::Bool);
        assert_eq!(classify(&table, &ty("double"), None), ValueClass::Value);
        assert_eq!(classify(&table, &ty("int?"), None), ValueClass::NullableValue);
        assert_eq!(classify(&table, &ty("string"), None), ValueClass::Reference);
        assert_eq!(classify(&table, &ty("int[]"), None), ValueClass::Reference);
        assert_eq!(classify(&table, &ty("Unknown"), None), ValueClass::Reference);
    }

    #[test]
    fn test_declared_types() {
        let unit = parse_unit(
            "a.lm",
            "enum Small { A } enum Big : long { A } struct Vec2 { } class Box<T : class, U> { }",
        )
        .unwrap();
        let table = SymbolTable::build([&unit]);
        let boxed = table.lookup("Box", 2);
        assert_eq!(classify(&table, &ty("Small"), None), ValueClass::Enum { wide: false });
        assert_eq!(classify(&table, &ty("Big"), None), ValueClass::Enum { wide: true });
        assert_eq!(classify(&table, &ty("Vec2"), None), ValueClass::Value);
        assert_eq!(
            classify(&table, &ty("T"), boxed),
            ValueClass::TypeParam {
                class_constrained: true
            }
        );
        assert_eq!(
            classify(&table, &ty("U"), boxed),
            ValueClass::TypeParam {
                class_constrained: false
            }
        );
    }

    #[test]
    fn test_enumerable_elements() {
        assert_eq!(enumerable_element(&ty("List<int>")), Some(ty("int")));
        assert_eq!(enumerable_element(&ty("string[]")), Some(ty("string")));
        assert_eq!(enumerable_element(&ty("string")), None);
        assert_eq!(enumerable_element(&ty("Dictionary<int>")), None);
    }
}
