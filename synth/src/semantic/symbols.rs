//! Declarations indexed across units
//!
//! Types are keyed by their qualified name plus generic arity, so
//! `Geo.Box<T>` and a static companion `Geo.Box` are distinct types while
//! every `partial` declaration of `Geo.Point` lands in one entry.

use super::{MethodId, TypeId};
use fxhash::FxHashMap;
use parser::{
    Annotation, Expr, Item, Member, MethodDecl, Modifier, NodeId, Param, Span, TypeDecl,
    TypeKind, TypeParam, TypeRef, Unit,
};

/// Where a declaration sits: working-set unit index plus node id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclSite {
    pub unit: usize,
    pub node: NodeId,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub id: TypeId,
    pub name: String,
    /// Namespace and enclosing types joined with dots
    pub qualified: String,
    pub namespace: Vec<String>,
    pub kind: TypeKind,
    pub type_params: Vec<TypeParam>,
    /// Bases of every partial declaration, first occurrence wins
    pub bases: Vec<TypeRef>,
    pub enclosing: Option<TypeId>,
    pub nested: Vec<TypeId>,
    pub is_abstract: bool,
    pub is_static: bool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodId>,
    pub sites: Vec<DeclSite>,
}

impl TypeInfo {
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    /// Underlying storage of an enum (`int` when not written)
    pub fn enum_underlying(&self) -> Option<TypeRef> {
        if self.kind != TypeKind::Enum {
            return None;
        }
        Some(
            self.bases
                .first()
                .cloned()
                .unwrap_or_else(|| TypeRef::simple("int")),
        )
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn type_param(&self, name: &str) -> Option<&TypeParam> {
        self.type_params.iter().find(|p| p.name == name)
    }
}

/// Field or auto-property
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub ty: TypeRef,
    pub owner: TypeId,
    pub is_static: bool,
    pub is_implicit: bool,
    pub is_property: bool,
    /// Fields are always readable; properties only with a getter
    pub readable: bool,
    /// Declared with an initializer
    pub initialized: bool,
    pub site: DeclSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub ty: TypeRef,
    pub is_implicit: bool,
    pub default: Option<Expr>,
}

impl ParamInfo {
    fn from_param(param: &Param) -> Self {
        Self {
            name: param.name.clone(),
            ty: param.ty.clone(),
            is_implicit: param.has_annotation("implicit"),
            default: param.default.clone(),
        }
    }

    /// May be left out at a call site
    pub fn is_optional(&self) -> bool {
        self.default.is_some() || self.is_implicit
    }
}

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: MethodId,
    pub owner: TypeId,
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<ParamInfo>,
    pub return_type: TypeRef,
    pub type_params: Vec<TypeParam>,
    pub is_static: bool,
    pub annotations: Vec<Annotation>,
    pub has_body: bool,
    pub site: DeclSite,
}

impl MethodInfo {
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    pub fn is_pass_through(&self) -> bool {
        self.kind == MethodKind::Method && self.has_annotation("pass_through")
    }

    pub fn implicit_params(&self) -> impl Iterator<Item = &ParamInfo> {
        self.params.iter().filter(|p| p.is_implicit)
    }

    /// Whether a call with `args` binds to this signature. Positional
    /// arguments fill parameters in order, named ones by name, and every
    /// parameter left over must be optional. With `open_names`, names that
    /// match no declared parameter are tolerated (pass-through methods gain
    /// parameters later).
    pub fn accepts(&self, positional: usize, named: &[String], open_names: bool) -> bool {
        if positional > self.params.len() {
            return false;
        }
        for name in named {
            match self.params.iter().position(|p| &p.name == name) {
                Some(index) if index < positional => return false,
                Some(_) => {}
                None if open_names => {}
                None => return false,
            }
        }
        self.params
            .iter()
            .enumerate()
            .skip(positional)
            .all(|(_, p)| p.is_optional() || named.contains(&p.name))
    }
}

/// Index of every declaration in a set of units
#[derive(Debug, Default)]
pub struct SymbolTable {
    types: Vec<TypeInfo>,
    methods: Vec<MethodInfo>,
    by_key: FxHashMap<String, TypeId>,
    by_simple: FxHashMap<(String, usize), Vec<TypeId>>,
    type_sites: FxHashMap<(usize, NodeId), TypeId>,
    method_sites: FxHashMap<(usize, NodeId), MethodId>,
}

fn type_key(qualified: &str, arity: usize) -> String {
    if arity == 0 {
        qualified.to_string()
    } else {
        format!("{}`{}", qualified, arity)
    }
}

impl SymbolTable {
    /// Index `units`; a unit's position in the slice is its unit index
    pub fn build<'u>(units: impl IntoIterator<Item = &'u Unit>) -> Self {
        let mut table = Self::default();
        let mut namespace = Vec::new();
        for (index, unit) in units.into_iter().enumerate() {
            table.collect_items(index, &unit.items, &mut namespace);
        }
        log::debug!(
            "symbol table: {} types, {} methods",
            table.types.len(),
            table.methods.len()
        );
        table
    }

    fn collect_items(&mut self, unit: usize, items: &[Item], namespace: &mut Vec<String>) {
        for item in items {
            match item {
                Item::Namespace(ns) => {
                    let depth = namespace.len();
                    namespace.extend(ns.path.iter().cloned());
                    self.collect_items(unit, &ns.items, namespace);
                    namespace.truncate(depth);
                }
                Item::Type(decl) => {
                    self.collect_type(unit, decl, namespace, None);
                }
            }
        }
    }

    fn collect_type(
        &mut self,
        unit: usize,
        decl: &TypeDecl,
        namespace: &[String],
        enclosing: Option<TypeId>,
    ) -> TypeId {
        let prefix = match enclosing {
            Some(outer) => self.types[outer.index()].qualified.clone(),
            None => namespace.join("."),
        };
        let qualified = if prefix.is_empty() {
            decl.name.clone()
        } else {
            format!("{}.{}", prefix, decl.name)
        };
        let key = type_key(&qualified, decl.type_params.len());

        let id = match self.by_key.get(&key) {
            Some(&id) => {
                let info = &mut self.types[id.index()];
                for base in &decl.bases {
                    if !info.bases.contains(base) {
                        info.bases.push(base.clone());
                    }
                }
                info.is_abstract |= decl.has_modifier(Modifier::Abstract);
                info.is_static |= decl.is_static();
                id
            }
            None => {
                let id = TypeId(self.types.len() as u32);
                self.types.push(TypeInfo {
                    id,
                    name: decl.name.clone(),
                    qualified,
                    namespace: namespace.to_vec(),
                    kind: decl.kind,
                    type_params: decl.type_params.clone(),
                    bases: decl.bases.clone(),
                    enclosing,
                    nested: Vec::new(),
                    is_abstract: decl.has_modifier(Modifier::Abstract),
                    is_static: decl.is_static(),
                    fields: Vec::new(),
                    methods: Vec::new(),
                    sites: Vec::new(),
                });
                self.by_key.insert(key, id);
                self.by_simple
                    .entry((decl.name.clone(), decl.type_params.len()))
                    .or_default()
                    .push(id);
                if let Some(outer) = enclosing {
                    self.types[outer.index()].nested.push(id);
                }
                id
            }
        };

        self.types[id.index()].sites.push(DeclSite {
            unit,
            node: decl.id,
            span: decl.span,
        });
        self.type_sites.insert((unit, decl.id), id);

        for member in &decl.members {
            let site = DeclSite {
                unit,
                node: member.id(),
                span: member.span(),
            };
            match member {
                Member::Field(field) => self.types[id.index()].fields.push(FieldInfo {
                    name: field.name.clone(),
                    ty: field.ty.clone(),
                    owner: id,
                    is_static: member.is_static() || field.modifiers.contains(&Modifier::Const),
                    is_implicit: field.annotations.iter().any(|a| a.name == "implicit"),
                    is_property: false,
                    readable: true,
                    initialized: field.init.is_some(),
                    site,
                }),
                Member::Property(prop) => self.types[id.index()].fields.push(FieldInfo {
                    name: prop.name.clone(),
                    ty: prop.ty.clone(),
                    owner: id,
                    is_static: member.is_static(),
                    is_implicit: prop.annotations.iter().any(|a| a.name == "implicit"),
                    is_property: true,
                    readable: prop.getter,
                    initialized: prop.init.is_some(),
                    site,
                }),
                Member::Method(method) => {
                    self.add_method(id, method, site);
                }
                Member::Constructor(ctor) => {
                    let method_id = MethodId(self.methods.len() as u32);
                    self.methods.push(MethodInfo {
                        id: method_id,
                        owner: id,
                        name: ctor.name.clone(),
                        kind: MethodKind::Constructor,
                        params: ctor.params.iter().map(ParamInfo::from_param).collect(),
                        return_type: TypeRef::simple(decl.name.clone()),
                        type_params: Vec::new(),
                        is_static: false,
                        annotations: ctor.annotations.clone(),
                        has_body: true,
                        site,
                    });
                    self.types[id.index()].methods.push(method_id);
                    self.method_sites.insert((unit, ctor.id), method_id);
                }
                Member::Type(nested) => {
                    self.collect_type(unit, nested, namespace, Some(id));
                }
            }
        }
        id
    }

    fn add_method(&mut self, owner: TypeId, method: &MethodDecl, site: DeclSite) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodInfo {
            id,
            owner,
            name: method.name.clone(),
            kind: MethodKind::Method,
            params: method.params.iter().map(ParamInfo::from_param).collect(),
            return_type: method.return_type.clone(),
            type_params: method.type_params.clone(),
            is_static: method.is_static(),
            annotations: method.annotations.clone(),
            has_body: method.body.is_some(),
            site,
        });
        self.types[owner.index()].methods.push(id);
        self.method_sites.insert((site.unit, method.id), id);
        id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn type_info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodInfo {
        &self.methods[id.index()]
    }

    /// All types in declaration order
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }

    /// All methods and constructors in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn lookup(&self, qualified: &str, arity: usize) -> Option<TypeId> {
        self.by_key.get(&type_key(qualified, arity)).copied()
    }

    /// Type declared by the node `node` of unit `unit`
    pub fn type_at(&self, unit: usize, node: NodeId) -> Option<TypeId> {
        self.type_sites.get(&(unit, node)).copied()
    }

    /// Method or constructor declared by the node `node` of unit `unit`
    pub fn method_at(&self, unit: usize, node: NodeId) -> Option<MethodId> {
        self.method_sites.get(&(unit, node)).copied()
    }

    /// Generic parameter named `name` visible from `context`
    pub fn type_param_in(&self, name: &str, context: Option<TypeId>) -> Option<&TypeParam> {
        let mut current = context;
        while let Some(id) = current {
            let info = self.type_info(id);
            if let Some(param) = info.type_param(name) {
                return Some(param);
            }
            current = info.enclosing;
        }
        None
    }

    /// Resolve a written type as seen from inside `context`: nested types of
    /// the context and its enclosing types first, then each namespace prefix
    /// from the innermost outwards, then a unique simple name anywhere.
    pub fn resolve_type(&self, ty: &TypeRef, context: Option<TypeId>) -> Option<TypeId> {
        let arity = ty.args.len();
        let dotted = ty.name.contains('.');
        if !dotted && arity == 0 && self.type_param_in(&ty.name, context).is_some() {
            return None;
        }

        if let Some(ctx) = context {
            let mut current = Some(ctx);
            while let Some(id) = current {
                let info = self.type_info(id);
                let candidate = format!("{}.{}", info.qualified, ty.name);
                if let Some(found) = self.lookup(&candidate, arity) {
                    return Some(found);
                }
                current = info.enclosing;
            }

            let namespace = &self.type_info(ctx).namespace;
            for depth in (1..=namespace.len()).rev() {
                let candidate = format!("{}.{}", namespace[..depth].join("."), ty.name);
                if let Some(found) = self.lookup(&candidate, arity) {
                    return Some(found);
                }
            }
        }

        if let Some(found) = self.lookup(&ty.name, arity) {
            return Some(found);
        }

        if !dotted {
            if let Some(ids) = self.by_simple.get(&(ty.name.clone(), arity)) {
                if ids.len() == 1 {
                    return Some(ids[0]);
                }
            }
        }
        None
    }

    /// Type reference naming `id` itself, its generic parameters as arguments
    pub fn self_type_ref(&self, id: TypeId) -> TypeRef {
        let info = self.type_info(id);
        TypeRef::generic(
            info.name.clone(),
            info.type_params
                .iter()
                .map(|p| TypeRef::simple(p.name.clone()))
                .collect(),
        )
    }

    /// First base that resolves to a class
    pub fn base_class(&self, id: TypeId) -> Option<TypeId> {
        let info = self.type_info(id);
        if info.kind != TypeKind::Class {
            return None;
        }
        info.bases
            .iter()
            .filter_map(|base| self.resolve_type(base, Some(id)))
            .find(|&base| self.type_info(base).kind == TypeKind::Class)
    }

    /// `id` followed by its base classes, nearest first
    pub fn base_chain(&self, id: TypeId) -> Vec<TypeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(base) = self.base_class(current) {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Resolved bases written on the declaration(s) of `id`
    pub fn direct_supertypes(&self, id: TypeId) -> Vec<TypeId> {
        self.type_info(id)
            .bases
            .iter()
            .filter_map(|base| self.resolve_type(base, Some(id)))
            .collect()
    }

    /// Methods named `name` on `id` and its base classes, nearest first
    pub fn find_methods(&self, id: TypeId, name: &str) -> Vec<MethodId> {
        self.base_chain(id)
            .into_iter()
            .flat_map(|t| self.type_info(t).methods.iter().copied())
            .filter(|&m| {
                let method = self.method(m);
                method.kind == MethodKind::Method && method.name == name
            })
            .collect()
    }

    /// Field or property named `name` on `id` and its base classes
    pub fn find_field(&self, id: TypeId, name: &str) -> Option<&FieldInfo> {
        self.base_chain(id)
            .into_iter()
            .find_map(|t| self.type_info(t).field(name))
    }

    /// `Owner.method` for messages
    pub fn method_display(&self, id: MethodId) -> String {
        let method = self.method(id);
        format!("{}.{}", self.type_info(method.owner).name, method.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::parse_unit;

    fn table(sources: &[&str]) -> SymbolTable {
        let units: Vec<Unit> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| parse_unit(&format!("u{}.lm", i), s).expect("unit should parse"))
            .collect();
        SymbolTable::build(units.iter())
    }

    #[test]
    fn test_partial_declarations_merge() {
        let table = table(&[
            "namespace Geo { partial class Point { int x; } }",
            "namespace Geo { partial class Point : IShape { int y; int area() => 0; } }",
        ]);
        let id = table.lookup("Geo.Point", 0).unwrap();
        let info = table.type_info(id);
        assert_eq!(info.fields.len(), 2);
        assert_eq!(info.sites.len(), 2);
        assert_eq!(info.bases, vec![TypeRef::simple("IShape")]);
        assert_eq!(table.find_methods(id, "area").len(), 1);
    }

    #[test]
    fn test_arity_distinguishes_companions() {
        let table = table(&["class Box<T> { T value; } static class Box { }"]);
        assert_ne!(table.lookup("Box", 1), table.lookup("Box", 0));
        assert!(table.type_info(table.lookup("Box", 0).unwrap()).is_static);
    }

    #[test]
    fn test_resolution_prefers_nested_then_namespace() {
        let table = table(&[
            "namespace A.B { class Outer { class Logger { } void f() { } } class Logger { } }",
            "class Logger { }",
        ]);
        let outer = table.lookup("A.B.Outer", 0).unwrap();
        let nested = table.lookup("A.B.Outer.Logger", 0).unwrap();
        assert_eq!(
            table.resolve_type(&TypeRef::simple("Logger"), Some(outer)),
            Some(nested)
        );
        let in_namespace = table.lookup("A.B.Logger", 0).unwrap();
        assert_eq!(
            table.resolve_type(&TypeRef::simple("Logger"), Some(in_namespace)),
            Some(in_namespace)
        );
        assert_eq!(
            table.resolve_type(&TypeRef::simple("Logger"), None),
            table.lookup("Logger", 0)
        );
    }

    #[test]
    fn test_base_chain_and_inherited_members() {
        let table = table(&[
            "class Base { @implicit Logger log; void run() { } } class Derived : Base, IThing { }",
        ]);
        let derived = table.lookup("Derived", 0).unwrap();
        let base = table.lookup("Base", 0).unwrap();
        assert_eq!(table.base_chain(derived), vec![derived, base]);
        assert!(table.find_field(derived, "log").unwrap().is_implicit);
        assert_eq!(table.find_methods(derived, "run").len(), 1);
    }

    #[test]
    fn test_type_params_do_not_resolve() {
        let table = table(&["class T { } class Box<T> { T value; }"]);
        let boxed = table.lookup("Box", 1).unwrap();
        assert_eq!(table.resolve_type(&TypeRef::simple("T"), Some(boxed)), None);
    }

    #[test]
    fn test_accepts_named_and_optional() {
        let table = table(&[
            "class C { void log(string msg, int level = 0, @implicit Logger logger) { } }",
        ]);
        let c = table.lookup("C", 0).unwrap();
        let method = table.method(table.find_methods(c, "log")[0]);
        assert!(method.accepts(1, &[], false));
        assert!(method.accepts(1, &["logger".to_string()], false));
        assert!(!method.accepts(0, &[], false));
        assert!(!method.accepts(1, &["other".to_string()], false));
        assert!(method.accepts(1, &["other".to_string()], true));
        assert!(!method.accepts(4, &[], false));
    }
}
