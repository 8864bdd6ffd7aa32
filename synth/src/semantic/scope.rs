//! Lexical scope inside a method body
//!
//! `BodyScope` tracks locals block by block on top of the enclosing type's
//! members, answers what a simple name refers to, gives a best-effort static
//! type for expressions and binds call expressions to declared methods.

use super::{FieldInfo, MethodId, SymbolTable, TypeId};
use parser::{Argument, BinaryOp, Expr, ExprKind, Literal, TypeRef, UnaryOp};

/// What a simple name refers to
#[derive(Debug, Clone)]
pub enum Resolved<'t> {
    /// Local variable, parameter or local function; type when known
    Local(Option<TypeRef>),
    Field(&'t FieldInfo),
    Methods(Vec<MethodId>),
    Type(TypeId),
    Unknown,
}

#[derive(Debug, Clone)]
struct Local {
    name: String,
    ty: Option<TypeRef>,
}

pub struct BodyScope<'t> {
    table: &'t SymbolTable,
    owner: Option<TypeId>,
    is_static: bool,
    frames: Vec<Vec<Local>>,
}

impl<'t> BodyScope<'t> {
    pub fn new(table: &'t SymbolTable, owner: Option<TypeId>, is_static: bool) -> Self {
        Self {
            table,
            owner,
            is_static,
            frames: vec![Vec::new()],
        }
    }

    pub fn table(&self) -> &'t SymbolTable {
        self.table
    }

    /// Type whose member body this scope belongs to
    pub fn owner(&self) -> Option<TypeId> {
        self.owner
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Option<TypeRef>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Local {
                name: name.into(),
                ty,
            });
        }
    }

    fn local(&self, name: &str) -> Option<&Local> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|local| local.name == name)
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.local(name).is_some()
    }

    /// Names of every visible local, outermost first
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.frames
            .iter()
            .flat_map(|frame| frame.iter())
            .map(|local| local.name.as_str())
    }

    /// Resolve a simple name: locals innermost first, then fields and
    /// methods of the owner's base chain, then types
    pub fn resolve(&self, name: &str) -> Resolved<'t> {
        if let Some(local) = self.local(name) {
            return Resolved::Local(local.ty.clone());
        }
        if let Some(owner) = self.owner {
            if let Some(field) = self.table.find_field(owner, name) {
                return Resolved::Field(field);
            }
            let methods = self.table.find_methods(owner, name);
            if !methods.is_empty() {
                return Resolved::Methods(methods);
            }
        }
        match self.table.resolve_type(&TypeRef::simple(name), self.owner) {
            Some(id) => Resolved::Type(id),
            None => Resolved::Unknown,
        }
    }

    /// Best-effort static type of `expr`; `None` when it cannot be told
    /// without full type checking
    pub fn type_of(&self, expr: &Expr) -> Option<TypeRef> {
        match &expr.kind {
            ExprKind::Literal(literal) => literal_type(literal),
            ExprKind::Ident(name) => match self.resolve(name) {
                Resolved::Local(ty) => ty,
                Resolved::Field(field) => Some(field.ty.clone()),
                _ => None,
            },
            ExprKind::This => self.owner.map(|id| self.table.self_type_ref(id)),
            ExprKind::Member { target, name } => {
                let receiver = self.receiver_type(target)?;
                self.table.find_field(receiver, name).map(|f| f.ty.clone())
            }
            ExprKind::Call { callee, args } => self
                .resolve_call(callee, args)
                .map(|m| self.table.method(m).return_type.clone()),
            ExprKind::New { ty, .. } | ExprKind::Cast { ty, .. } => Some(ty.clone()),
            ExprKind::Default(ty) => ty.clone(),
            ExprKind::Is { .. } => Some(TypeRef::simple("bool")),
            ExprKind::Unary { op, expr } => match op {
                UnaryOp::Not => Some(TypeRef::simple("bool")),
                _ => self.type_of(expr),
            },
            ExprKind::Binary { op, left, right } => match op {
                BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or => Some(TypeRef::simple("bool")),
                BinaryOp::Add => {
                    let left_ty = self.type_of(left);
                    let right_ty = self.type_of(right);
                    let is_string = |t: &Option<TypeRef>| {
                        t.as_ref().map(|t| t.name == "string").unwrap_or(false)
                    };
                    if is_string(&left_ty) || is_string(&right_ty) {
                        Some(TypeRef::simple("string"))
                    } else {
                        left_ty
                    }
                }
                _ => self.type_of(left),
            },
            ExprKind::Conditional { then_expr, .. } => self.type_of(then_expr),
            ExprKind::Assign { target, .. } => self.type_of(target),
            ExprKind::Index { target, .. } => {
                let target_ty = self.type_of(target)?;
                if target_ty.array_rank > 0 {
                    Some(TypeRef {
                        array_rank: target_ty.array_rank - 1,
                        ..target_ty
                    })
                } else {
                    None
                }
            }
            ExprKind::Paren(inner) => self.type_of(inner),
        }
    }

    /// Type a member access or call on `target` looks into. A bare name that
    /// is neither a local nor a field is read as a type (static access).
    fn receiver_type(&self, target: &Expr) -> Option<TypeId> {
        if let Some(id) = self.static_receiver(target) {
            return Some(id);
        }
        let ty = self.type_of(target)?;
        self.table.resolve_type(&ty, self.owner)
    }

    /// `target` names a type rather than a value
    pub fn static_receiver(&self, target: &Expr) -> Option<TypeId> {
        match &target.kind {
            ExprKind::Ident(name) => match self.resolve(name) {
                Resolved::Type(id) => Some(id),
                _ => None,
            },
            ExprKind::Member { .. } => {
                let dotted = dotted_path(target)?;
                if let Some(first) = dotted.split('.').next() {
                    if self.is_local(first) {
                        return None;
                    }
                    if let Some(owner) = self.owner {
                        if self.table.find_field(owner, first).is_some() {
                            return None;
                        }
                    }
                }
                self.table.resolve_type(&TypeRef::simple(dotted), self.owner)
            }
            _ => None,
        }
    }

    /// Methods a callee expression could refer to, nearest declaration first
    pub fn callee_candidates(&self, callee: &Expr) -> Vec<MethodId> {
        match &callee.kind {
            ExprKind::Ident(name) => match self.resolve(name) {
                Resolved::Methods(methods) => methods,
                _ => Vec::new(),
            },
            ExprKind::Member { target, name } => match self.receiver_type(target) {
                Some(receiver) => self.table.find_methods(receiver, name),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Bind a call to the first declared method whose signature accepts `args`
    pub fn resolve_call(&self, callee: &Expr, args: &[Argument]) -> Option<MethodId> {
        let positional = args.iter().filter(|a| a.name.is_none()).count();
        let named: Vec<String> = args.iter().filter_map(|a| a.name.clone()).collect();
        self.callee_candidates(callee).into_iter().find(|&m| {
            let method = self.table.method(m);
            method.accepts(positional, &named, method.is_pass_through())
        })
    }
}

fn literal_type(literal: &Literal) -> Option<TypeRef> {
    match literal {
        Literal::Int { long: false, .. } => Some(TypeRef::simple("int")),
        Literal::Int { long: true, .. } => Some(TypeRef::simple("long")),
        Literal::Float(text) => {
            let name = match text.chars().last() {
                Some('f') | Some('F') => "float",
                Some('m') | Some('M') => "decimal",
                _ => "double",
            };
            Some(TypeRef::simple(name))
        }
        Literal::String(_) => Some(TypeRef::simple("string")),
        Literal::Bool(_) => Some(TypeRef::simple("bool")),
        Literal::Null => None,
    }
}

/// `A.B.C` for a chain of member accesses over an identifier
fn dotted_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Member { target, name } => {
            dotted_path(target).map(|prefix| format!("{}.{}", prefix, name))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::{parse_expression, parse_unit};

    const SOURCE: &str = r#"
        namespace App {
            class Logger { void write(string msg) { } }
            class Service {
                Logger logger;
                static int count;
                void run(int n) { }
                static Service make() => new Service();
            }
        }
    "#;

    fn with_scope(check: impl FnOnce(&mut BodyScope)) {
        let unit = parse_unit("a.lm", SOURCE).unwrap();
        let table = SymbolTable::build([&unit]);
        let owner = table.lookup("App.Service", 0);
        let mut scope = BodyScope::new(&table, owner, false);
        check(&mut scope);
    }

    fn expr(text: &str) -> Expr {
        parse_expression(text).expect("expression should parse")
    }

    #[test]
    fn test_locals_shadow_fields() {
        with_scope(|scope| {
            assert!(matches!(scope.resolve("logger"), Resolved::Field(_)));
            scope.push();
            scope.declare("logger", Some(TypeRef::simple("int")));
            assert!(matches!(scope.resolve("logger"), Resolved::Local(Some(_))));
            scope.pop();
            assert!(matches!(scope.resolve("logger"), Resolved::Field(_)));
        });
    }

    #[test]
    fn test_type_of_expressions() {
        with_scope(|scope| {
            assert_eq!(scope.type_of(&expr("1L")), Some(TypeRef::simple("long")));
            assert_eq!(scope.type_of(&expr("\"a\" + 1")), Some(TypeRef::simple("string")));
            assert_eq!(scope.type_of(&expr("this.logger")), Some(TypeRef::simple("Logger")));
            assert_eq!(scope.type_of(&expr("Service.count")), Some(TypeRef::simple("int")));
            assert_eq!(scope.type_of(&expr("Service.make()")), Some(TypeRef::simple("Service")));
        });
    }

    #[test]
    fn test_resolves_calls_through_receivers() {
        with_scope(|scope| {
            let call = expr("logger.write(\"hi\")");
            let ExprKind::Call { callee, args } = &call.kind else {
                panic!("expected a call");
            };
            let method = scope.resolve_call(callee, args).unwrap();
            assert_eq!(scope.table().method_display(method), "Logger.write");

            let call = expr("run()");
            let ExprKind::Call { callee, args } = &call.kind else {
                panic!("expected a call");
            };
            assert!(scope.resolve_call(callee, args).is_none());
        });
    }
}
