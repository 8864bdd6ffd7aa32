//! Call-site discovery
//!
//! Walks every member body of one unit with a lexical scope, binds calls to
//! declared methods and sorts what it finds:
//!
//! - calls of macro methods become scheduled expansion edits, or a position
//!   error when the expansion cannot be placed there;
//! - calls of methods with unsupplied `@implicit` parameters, and every call
//!   of a `@pass_through` method, become [`CallSite`]s for the solver;
//! - any other mention of a macro method is an unresolved reference.

use crate::errors::MacroError;
use crate::macros::{MacroDefinition, MacroKind, MacroTable};
use crate::program::ProgramUnit;
use crate::rewrite::{ExprEdit, StmtEdit, UnitEdits};
use crate::semantic::{
    enumerable_element, BodyScope, MethodId, MethodInfo, MethodKind, Resolved, SymbolTable, TypeId,
};
use diagnostics::{Diagnostics, SourceMap, SourceSpan};
use fxhash::FxHashSet;
use parser::visit::{self, Visit};
use parser::{
    Argument, Block, Body, Expr, ExprKind, Member, MethodDecl, NodeId, Param, Span, Stmt,
    StmtKind, TypeDecl, TypeRef,
};

/// A call that may need implicit arguments
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Working-set index of the unit holding the call
    pub unit: usize,
    /// Call or `new` expression
    pub call: NodeId,
    /// Method or constructor whose body holds the call; `None` in field
    /// initializers
    pub enclosing: Option<MethodId>,
    pub owner: Option<TypeId>,
    pub is_static: bool,
    pub callee: MethodId,
    /// Callee parameters given explicitly
    pub supplied: Vec<String>,
    /// Visible locals and non-implicit parameters at the call
    pub shadowing: Vec<String>,
    pub span: SourceSpan,
}

impl CallSite {
    pub fn supplies(&self, param: &str) -> bool {
        self.supplied.iter().any(|s| s == param)
    }
}

/// Everything found in one unit
#[derive(Debug, Default)]
pub struct UnitDiscovery {
    pub edits: UnitEdits,
    pub call_sites: Vec<CallSite>,
    pub diagnostics: Diagnostics,
}

/// Discover the unit at working-set position `index`
pub fn discover_unit(
    index: usize,
    unit: &ProgramUnit,
    table: &SymbolTable,
    macros: &MacroTable,
    source_map: &SourceMap,
) -> UnitDiscovery {
    let mut discovery = Discovery {
        index,
        unit,
        table,
        macros,
        source_map,
        owner: None,
        scope: None,
        enclosing: None,
        implicit_params: Vec::new(),
        block_depth: 0,
        statement: None,
        inline_names: FxHashSet::default(),
        found: UnitDiscovery::default(),
    };
    discovery.visit_unit(&unit.unit);
    log::debug!(
        "discovered {}: {} edits, {} call sites",
        unit.path,
        discovery.found.edits.len(),
        discovery.found.call_sites.len()
    );
    discovery.found
}

/// How the expression being visited sits in its statement
#[derive(Debug, Clone, Copy)]
enum StmtRole {
    /// Whole expression of an expression statement
    Statement(NodeId),
    /// Initializer of a one-variable declaration
    Binding(NodeId),
    /// Initializer in a declaration of several variables
    Grouped,
}

struct Discovery<'a> {
    index: usize,
    unit: &'a ProgramUnit,
    table: &'a SymbolTable,
    macros: &'a MacroTable,
    source_map: &'a SourceMap,
    owner: Option<TypeId>,
    scope: Option<BodyScope<'a>>,
    enclosing: Option<MethodId>,
    implicit_params: Vec<String>,
    block_depth: usize,
    statement: Option<(NodeId, StmtRole)>,
    inline_names: FxHashSet<String>,
    found: UnitDiscovery,
}

/// Parameters of `method` a call with `args` gives explicitly
fn supplied_names(method: &MethodInfo, args: &[Argument]) -> Vec<String> {
    let positional = args.iter().filter(|a| a.name.is_none()).count();
    method
        .params
        .iter()
        .take(positional)
        .map(|p| p.name.clone())
        .chain(args.iter().filter_map(|a| a.name.clone()))
        .collect()
}

impl<'a> Discovery<'a> {
    fn span(&self, span: Span) -> SourceSpan {
        self.unit.source_span(self.source_map, span)
    }

    /// Walk one member body in a fresh scope holding `params`
    fn body(
        &mut self,
        enclosing: Option<MethodId>,
        is_static: bool,
        params: &[Param],
        walk: impl FnOnce(&mut Self),
    ) {
        let mut scope = BodyScope::new(self.table, self.owner, is_static);
        for param in params {
            scope.declare(param.name.clone(), Some(param.ty.clone()));
        }
        let implicit_params = params
            .iter()
            .filter(|p| p.has_annotation("implicit"))
            .map(|p| p.name.clone())
            .collect();

        let saved = (
            self.scope.replace(scope),
            std::mem::replace(&mut self.enclosing, enclosing),
            std::mem::replace(&mut self.implicit_params, implicit_params),
            std::mem::replace(&mut self.block_depth, 0),
        );
        walk(self);
        (
            self.scope,
            self.enclosing,
            self.implicit_params,
            self.block_depth,
        ) = saved;
    }

    fn declare(&mut self, name: &str, ty: Option<TypeRef>) {
        if let Some(scope) = &mut self.scope {
            scope.declare(name, ty);
        }
    }

    fn unsupported(&mut self, definition: &MacroDefinition, reason: &str, span: SourceSpan) {
        self.found.diagnostics.push(
            MacroError::UnsupportedPosition {
                name: definition.name.clone(),
                reason: reason.to_string(),
                span,
            }
            .into(),
        );
    }

    fn call(&mut self, expr: &Expr, callee: &Expr, args: &[Argument], role: Option<StmtRole>) {
        if let ExprKind::Member { target, .. } = &callee.kind {
            self.visit_expr(target);
        }
        for arg in args {
            self.visit_expr(&arg.value);
        }

        let Some(scope) = &self.scope else {
            return;
        };
        if let ExprKind::Ident(name) = &callee.kind {
            if scope.is_local(name) {
                return;
            }
        }
        let Some(method) = scope.resolve_call(callee, args) else {
            return;
        };

        let macros = self.macros;
        if let Some(definition) = macros.get(method) {
            self.schedule_macro(expr, definition, role);
            return;
        }
        self.record_call_site(expr, method, args);
    }

    fn construction(&mut self, expr: &Expr, ty: &TypeRef, args: &[Argument]) {
        let Some(scope) = &self.scope else {
            return;
        };
        let Some(created) = self.table.resolve_type(ty, scope.owner()) else {
            return;
        };
        let positional = args.iter().filter(|a| a.name.is_none()).count();
        let named: Vec<String> = args.iter().filter_map(|a| a.name.clone()).collect();
        let constructor = self
            .table
            .type_info(created)
            .methods
            .iter()
            .copied()
            .find(|&m| {
                let info = self.table.method(m);
                info.kind == MethodKind::Constructor && info.accepts(positional, &named, false)
            });
        if let Some(constructor) = constructor {
            self.record_call_site(expr, constructor, args);
        }
    }

    fn record_call_site(&mut self, expr: &Expr, callee: MethodId, args: &[Argument]) {
        let Some(scope) = &self.scope else {
            return;
        };
        let info = self.table.method(callee);
        let supplied = supplied_names(info, args);
        let needs_resolution = info.is_pass_through()
            || info
                .implicit_params()
                .any(|p| !supplied.iter().any(|s| s == &p.name));
        if !needs_resolution {
            return;
        }

        let mut shadowing: Vec<String> = Vec::new();
        for name in scope.local_names() {
            if !self.implicit_params.iter().any(|p| p == name)
                && !shadowing.iter().any(|s| s == name)
            {
                shadowing.push(name.to_string());
            }
        }
        let site = CallSite {
            unit: self.index,
            call: expr.id,
            enclosing: self.enclosing,
            owner: scope.owner(),
            is_static: scope.is_static(),
            callee,
            supplied,
            shadowing,
            span: self.span(expr.span),
        };
        self.found.call_sites.push(site);
    }

    fn schedule_macro(
        &mut self,
        expr: &Expr,
        definition: &MacroDefinition,
        role: Option<StmtRole>,
    ) {
        let span = self.span(expr.span);
        let macro_id = definition.method;
        match (&definition.kind, role) {
            (MacroKind::Pattern(_), _) => {
                self.found
                    .edits
                    .expr(expr.id, ExprEdit::Expand { macro_id }, span)
            }
            (MacroKind::StatementPattern(_), Some(StmtRole::Statement(stmt))) => {
                self.found
                    .edits
                    .stmt(stmt, StmtEdit::ExpandStatement { macro_id }, span)
            }
            (MacroKind::StatementPattern(_), _) => self.unsupported(
                definition,
                "a statement macro must be called as a statement of its own",
                span,
            ),
            (MacroKind::BindingPattern(_), Some(StmtRole::Binding(stmt))) => {
                self.found
                    .edits
                    .stmt(stmt, StmtEdit::ExpandBinding { macro_id }, span)
            }
            (MacroKind::BindingPattern(_), Some(StmtRole::Grouped)) => self.unsupported(
                definition,
                "a binding macro must initialize a declaration of exactly one variable",
                span,
            ),
            (MacroKind::BindingPattern(_), _) => self.unsupported(
                definition,
                "a binding macro must initialize a local variable declaration",
                span,
            ),
            (MacroKind::Inline, _) if self.block_depth == 0 => {
                self.unsupported(definition, "inline calls need an enclosing block", span)
            }
            (MacroKind::Inline, _) => {
                let name = self.inline_name(definition, expr.span);
                self.found
                    .edits
                    .expr(expr.id, ExprEdit::Inline { macro_id, name }, span)
            }
        }
    }

    /// `<method>_inline_<line>_<col>`, suffixed when taken
    fn inline_name(&mut self, definition: &MacroDefinition, at: Span) -> String {
        let (line, column) = self
            .source_map
            .offset_to_line_col(self.unit.file_id, at.start)
            .unwrap_or((0, 0));
        let base = format!("{}_inline_{}_{}", definition.name, line, column);
        let mut name = base.clone();
        let mut suffix = 2;
        while self.inline_names.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        self.inline_names.insert(name.clone());
        name
    }

    /// Mentions of macro methods outside a call's callee position
    fn check_reference(&mut self, expr: &Expr) {
        let Some(scope) = &self.scope else {
            return;
        };
        let methods = match &expr.kind {
            ExprKind::Ident(name) => match scope.resolve(name) {
                Resolved::Methods(methods) => methods,
                _ => return,
            },
            ExprKind::Member { .. } => scope.callee_candidates(expr),
            _ => return,
        };
        if let Some(definition) = methods.into_iter().find_map(|m| self.macros.get(m)) {
            let name = definition.name.clone();
            let span = self.span(expr.span);
            self.found
                .diagnostics
                .push(MacroError::UnresolvedReference { name, span }.into());
        }
    }
}

impl<'a> Visit for Discovery<'a> {
    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        let outer = self.owner;
        self.owner = self.table.type_at(self.index, decl.id);
        visit::walk_type_decl(self, decl);
        self.owner = outer;
    }

    fn visit_member(&mut self, member: &Member) {
        match member {
            Member::Method(method) => {
                let id = self.table.method_at(self.index, method.id);
                self.body(id, method.is_static(), &method.params, |this| {
                    match &method.body {
                        Some(Body::Block(block)) => this.visit_block(block),
                        Some(Body::Expr(expr)) => this.visit_expr(expr),
                        None => {}
                    }
                });
            }
            Member::Constructor(ctor) => {
                let id = self.table.method_at(self.index, ctor.id);
                self.body(id, false, &ctor.params, |this| this.visit_block(&ctor.body));
            }
            Member::Field(field) => {
                if let Some(init) = &field.init {
                    self.body(None, member.is_static(), &[], |this| this.visit_expr(init));
                }
            }
            Member::Property(prop) => {
                if let Some(init) = &prop.init {
                    self.body(None, member.is_static(), &[], |this| this.visit_expr(init));
                }
            }
            Member::Type(nested) => self.visit_type_decl(nested),
        }
    }

    fn visit_local_function(&mut self, method: &MethodDecl) {
        if let Some(scope) = &mut self.scope {
            scope.push();
        }
        for param in &method.params {
            self.declare(&param.name, Some(param.ty.clone()));
        }
        let depth = std::mem::replace(&mut self.block_depth, 0);
        match &method.body {
            Some(Body::Block(block)) => self.visit_block(block),
            Some(Body::Expr(expr)) => self.visit_expr(expr),
            None => {}
        }
        self.block_depth = depth;
        if let Some(scope) = &mut self.scope {
            scope.pop();
        }
    }

    fn visit_block(&mut self, block: &Block) {
        if let Some(scope) = &mut self.scope {
            scope.push();
        }
        // local functions are callable anywhere in their block
        for stmt in &block.stmts {
            if let StmtKind::LocalFunction(function) = &stmt.kind {
                let ty = function.return_type.clone();
                self.declare(&function.name, Some(ty));
            }
        }
        self.block_depth += 1;
        visit::walk_block(self, block);
        self.block_depth -= 1;
        if let Some(scope) = &mut self.scope {
            scope.pop();
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.statement = Some((expr.id, StmtRole::Statement(stmt.id)));
                self.visit_expr(expr);
            }
            StmtKind::Local(local) => {
                let role = if local.declarators.len() == 1 {
                    StmtRole::Binding(stmt.id)
                } else {
                    StmtRole::Grouped
                };
                for declarator in &local.declarators {
                    if let Some(init) = &declarator.init {
                        self.statement = Some((init.id, role));
                        self.visit_expr(init);
                    }
                    let ty = local.ty.clone().or_else(|| {
                        let init = declarator.init.as_ref()?;
                        self.scope.as_ref()?.type_of(init)
                    });
                    self.declare(&declarator.name, ty);
                }
            }
            StmtKind::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                self.visit_expr(iterable);
                let element = ty.clone().or_else(|| {
                    let iterable_ty = self.scope.as_ref()?.type_of(iterable)?;
                    enumerable_element(&iterable_ty)
                });
                if let Some(scope) = &mut self.scope {
                    scope.push();
                }
                self.declare(name, element);
                self.visit_stmt(body);
                if let Some(scope) = &mut self.scope {
                    scope.pop();
                }
            }
            _ => visit::walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        let role = match self.statement.take() {
            Some((id, role)) if id == expr.id => Some(role),
            _ => None,
        };
        if self.scope.is_none() {
            visit::walk_expr(self, expr);
            return;
        }

        match &expr.kind {
            ExprKind::Call { callee, args } => self.call(expr, callee, args, role),
            ExprKind::New { ty, args } => {
                visit::walk_expr(self, expr);
                self.construction(expr, ty, args);
            }
            ExprKind::Ident(_) | ExprKind::Member { .. } => {
                self.check_reference(expr);
                visit::walk_expr(self, expr);
            }
            ExprKind::Is {
                expr: inner,
                ty,
                binding,
            } => {
                self.visit_expr(inner);
                if let Some(binding) = binding {
                    self.declare(binding, Some(ty.clone()));
                }
            }
            _ => visit::walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::collect_definitions;
    use crate::program::UnitOrigin;
    use parser::parse_unit_in;

    fn discover(source: &str) -> UnitDiscovery {
        let mut source_map = SourceMap::new();
        let file_id = source_map.add_file("a.lm".to_string(), source.to_string());
        let unit = ProgramUnit {
            path: "a.lm".to_string(),
            file_id,
            unit: parse_unit_in(file_id, "a.lm", source).expect("unit should parse"),
            origin: UnitOrigin::Source,
        };
        let table = SymbolTable::build([&unit.unit]);
        let (definitions, diagnostics) = collect_definitions(0, &unit, &table, &source_map);
        assert!(diagnostics.is_empty());
        let macros: MacroTable = definitions.into_iter().collect();
        discover_unit(0, &unit, &table, &macros, &source_map)
    }

    const MACROS: &str = r#"
        class M {
            @pattern("\"<\" + ${x} + \">\"")
            static string tag(string x);
            @statement_pattern("Console.log(${x});")
            static void trace(string x);
            @binding_pattern("${varType} ${varName} = Cache.get(${key});")
            static string cached(string key);
            @inline
            static int twice(int x) { return x * 2; }
        }
    "#;

    #[test]
    fn test_macro_calls_become_edits() {
        let found = discover(&format!(
            "{}\nclass U {{ void run() {{ var t = M.tag(\"a\"); M.trace(t); string c = M.cached(\"k\"); int n = M.twice(2); }} }}",
            MACROS
        ));
        assert!(found.diagnostics.is_empty());
        assert_eq!(found.edits.exprs.len(), 2);
        assert_eq!(found.edits.stmts.len(), 2);
        let inline = found.edits.exprs.values().find_map(|s| match &s.edit {
            ExprEdit::Inline { name, .. } => Some(name.clone()),
            _ => None,
        });
        assert!(inline.unwrap().starts_with("twice_inline_"));
    }

    #[test]
    fn test_misplaced_macro_calls_are_reported() {
        let found = discover(&format!(
            "{}\nclass U {{ int a() => M.twice(1); void b() {{ var s = M.trace(\"x\"); string p = M.cached(\"a\"), q = \"\"; }} }}",
            MACROS
        ));
        assert_eq!(found.diagnostics.with_code("E7002").count(), 3);
        assert!(found.edits.is_empty());
    }

    #[test]
    fn test_macro_references_are_reported() {
        let found = discover(&format!(
            "{}\nclass U {{ void run(Func<string, string> f) {{ run(M.tag); }} }}",
            MACROS
        ));
        assert_eq!(found.diagnostics.with_code("E7001").count(), 1);
    }

    #[test]
    fn test_implicit_calls_become_call_sites() {
        let found = discover(
            r#"
            class Logger { }
            class Service {
                @implicit Logger logger;
                void write(string m, @implicit Logger log) { }
                void run(string logger2) {
                    write("a");
                    write("b", log: logger);
                    var w = new Worker();
                }
            }
            class Worker { Worker(@implicit Logger log) { } }
            "#,
        );
        assert!(found.diagnostics.is_empty());
        assert_eq!(found.call_sites.len(), 2);
        let site = &found.call_sites[0];
        assert_eq!(site.supplied, vec!["m".to_string()]);
        assert_eq!(site.shadowing, vec!["logger2".to_string()]);
        assert!(!site.is_static);
    }
}
