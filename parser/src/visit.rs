//! AST visitors for traversing and mutating Loom syntax trees.
//!
//! This module provides two traits:
//! - [`Visit`] - read-only traversal
//! - [`VisitMut`] - in-place mutation
//!
//! Every `visit_*` method defaults to the matching `walk_*` function, so an
//! implementation only overrides the nodes it cares about and calls the walk
//! function to keep descending.

use crate::ast::*;

// =============================================================================
// Read-Only Visitor
// =============================================================================

/// Trait for read-only AST visitors.
pub trait Visit {
    fn visit_unit(&mut self, unit: &Unit) {
        walk_unit(self, unit);
    }

    fn visit_item(&mut self, item: &Item) {
        walk_item(self, item);
    }

    fn visit_type_decl(&mut self, decl: &TypeDecl) {
        walk_type_decl(self, decl);
    }

    fn visit_member(&mut self, member: &Member) {
        walk_member(self, member);
    }

    /// Local functions declared inside a body
    fn visit_local_function(&mut self, method: &MethodDecl) {
        walk_method(self, method);
    }

    fn visit_block(&mut self, block: &Block) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_unit<V: Visit + ?Sized>(v: &mut V, unit: &Unit) {
    for item in &unit.items {
        v.visit_item(item);
    }
}

pub fn walk_item<V: Visit + ?Sized>(v: &mut V, item: &Item) {
    match item {
        Item::Namespace(ns) => {
            for item in &ns.items {
                v.visit_item(item);
            }
        }
        Item::Type(decl) => v.visit_type_decl(decl),
    }
}

pub fn walk_type_decl<V: Visit + ?Sized>(v: &mut V, decl: &TypeDecl) {
    for case in &decl.enum_cases {
        if let Some(value) = &case.value {
            v.visit_expr(value);
        }
    }
    for member in &decl.members {
        v.visit_member(member);
    }
}

pub fn walk_member<V: Visit + ?Sized>(v: &mut V, member: &Member) {
    match member {
        Member::Field(field) => {
            if let Some(init) = &field.init {
                v.visit_expr(init);
            }
        }
        Member::Property(prop) => {
            if let Some(init) = &prop.init {
                v.visit_expr(init);
            }
        }
        Member::Method(method) => walk_method(v, method),
        Member::Constructor(ctor) => {
            walk_params(v, &ctor.params);
            v.visit_block(&ctor.body);
        }
        Member::Type(decl) => v.visit_type_decl(decl),
    }
}

pub fn walk_method<V: Visit + ?Sized>(v: &mut V, method: &MethodDecl) {
    walk_params(v, &method.params);
    match &method.body {
        Some(Body::Block(block)) => v.visit_block(block),
        Some(Body::Expr(expr)) => v.visit_expr(expr),
        None => {}
    }
}

fn walk_params<V: Visit + ?Sized>(v: &mut V, params: &[Param]) {
    for param in params {
        if let Some(default) = &param.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_block<V: Visit + ?Sized>(v: &mut V, block: &Block) {
    for stmt in &block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(v: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::Local(local) => {
            for declarator in &local.declarators {
                if let Some(init) = &declarator.init {
                    v.visit_expr(init);
                }
            }
        }
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        StmtKind::Labeled { stmt, .. } => v.visit_stmt(stmt),
        StmtKind::LocalFunction(method) => v.visit_local_function(method),
        StmtKind::Break | StmtKind::Continue | StmtKind::Goto(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr<V: Visit + ?Sized>(v: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::Default(_) => {}
        ExprKind::Member { target, .. } => v.visit_expr(target),
        ExprKind::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(&arg.value);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                v.visit_expr(&arg.value);
            }
        }
        ExprKind::Cast { expr, .. }
        | ExprKind::Is { expr, .. }
        | ExprKind::Unary { expr, .. }
        | ExprKind::Paren(expr) => v.visit_expr(expr),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Index { target, index } => {
            v.visit_expr(target);
            v.visit_expr(index);
        }
    }
}

// =============================================================================
// Mutating Visitor
// =============================================================================

/// Trait for visitors that rewrite the tree in place.
pub trait VisitMut {
    fn visit_unit(&mut self, unit: &mut Unit) {
        walk_unit_mut(self, unit);
    }

    fn visit_item(&mut self, item: &mut Item) {
        walk_item_mut(self, item);
    }

    fn visit_type_decl(&mut self, decl: &mut TypeDecl) {
        walk_type_decl_mut(self, decl);
    }

    fn visit_member(&mut self, member: &mut Member) {
        walk_member_mut(self, member);
    }

    fn visit_local_function(&mut self, method: &mut MethodDecl) {
        walk_method_mut(self, method);
    }

    fn visit_block(&mut self, block: &mut Block) {
        walk_block_mut(self, block);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_unit_mut<V: VisitMut + ?Sized>(v: &mut V, unit: &mut Unit) {
    for item in &mut unit.items {
        v.visit_item(item);
    }
}

pub fn walk_item_mut<V: VisitMut + ?Sized>(v: &mut V, item: &mut Item) {
    match item {
        Item::Namespace(ns) => {
            for item in &mut ns.items {
                v.visit_item(item);
            }
        }
        Item::Type(decl) => v.visit_type_decl(decl),
    }
}

pub fn walk_type_decl_mut<V: VisitMut + ?Sized>(v: &mut V, decl: &mut TypeDecl) {
    for case in &mut decl.enum_cases {
        if let Some(value) = &mut case.value {
            v.visit_expr(value);
        }
    }
    for member in &mut decl.members {
        v.visit_member(member);
    }
}

pub fn walk_member_mut<V: VisitMut + ?Sized>(v: &mut V, member: &mut Member) {
    match member {
        Member::Field(field) => {
            if let Some(init) = &mut field.init {
                v.visit_expr(init);
            }
        }
        Member::Property(prop) => {
            if let Some(init) = &mut prop.init {
                v.visit_expr(init);
            }
        }
        Member::Method(method) => walk_method_mut(v, method),
        Member::Constructor(ctor) => {
            walk_params_mut(v, &mut ctor.params);
            v.visit_block(&mut ctor.body);
        }
        Member::Type(decl) => v.visit_type_decl(decl),
    }
}

pub fn walk_method_mut<V: VisitMut + ?Sized>(v: &mut V, method: &mut MethodDecl) {
    walk_params_mut(v, &mut method.params);
    match &mut method.body {
        Some(Body::Block(block)) => v.visit_block(block),
        Some(Body::Expr(expr)) => v.visit_expr(expr),
        None => {}
    }
}

fn walk_params_mut<V: VisitMut + ?Sized>(v: &mut V, params: &mut [Param]) {
    for param in params {
        if let Some(default) = &mut param.default {
            v.visit_expr(default);
        }
    }
}

pub fn walk_block_mut<V: VisitMut + ?Sized>(v: &mut V, block: &mut Block) {
    for stmt in &mut block.stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt_mut<V: VisitMut + ?Sized>(v: &mut V, stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::Block(block) => v.visit_block(block),
        StmtKind::Local(local) => {
            for declarator in &mut local.declarators {
                if let Some(init) = &mut declarator.init {
                    v.visit_expr(init);
                }
            }
        }
        StmtKind::Expr(expr) | StmtKind::Throw(expr) => v.visit_expr(expr),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                v.visit_expr(value);
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            v.visit_expr(cond);
            v.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            v.visit_expr(cond);
            v.visit_stmt(body);
        }
        StmtKind::ForEach { iterable, body, .. } => {
            v.visit_expr(iterable);
            v.visit_stmt(body);
        }
        StmtKind::Labeled { stmt, .. } => v.visit_stmt(stmt),
        StmtKind::LocalFunction(method) => v.visit_local_function(method),
        StmtKind::Break | StmtKind::Continue | StmtKind::Goto(_) | StmtKind::Empty => {}
    }
}

pub fn walk_expr_mut<V: VisitMut + ?Sized>(v: &mut V, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Ident(_)
        | ExprKind::This
        | ExprKind::Default(_) => {}
        ExprKind::Member { target, .. } => v.visit_expr(target),
        ExprKind::Call { callee, args } => {
            v.visit_expr(callee);
            for arg in args {
                v.visit_expr(&mut arg.value);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                v.visit_expr(&mut arg.value);
            }
        }
        ExprKind::Cast { expr, .. }
        | ExprKind::Is { expr, .. }
        | ExprKind::Unary { expr, .. }
        | ExprKind::Paren(expr) => v.visit_expr(expr),
        ExprKind::Binary { left, right, .. } => {
            v.visit_expr(left);
            v.visit_expr(right);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            v.visit_expr(cond);
            v.visit_expr(then_expr);
            v.visit_expr(else_expr);
        }
        ExprKind::Assign { target, value, .. } => {
            v.visit_expr(target);
            v.visit_expr(value);
        }
        ExprKind::Index { target, index } => {
            v.visit_expr(target);
            v.visit_expr(index);
        }
    }
}
