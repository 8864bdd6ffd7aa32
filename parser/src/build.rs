//! Helpers for constructing AST nodes in memory
//!
//! Nodes built here carry `NodeId::DUMMY` and an empty span. They are only
//! used to splice small, fixed shapes into trees that are already numbered.

use crate::ast::*;

pub fn ident(name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Ident(name.into()), Span::default())
}

pub fn this() -> Expr {
    Expr::new(ExprKind::This, Span::default())
}

pub fn member(target: Expr, name: impl Into<String>) -> Expr {
    Expr::new(
        ExprKind::Member {
            target: Box::new(target),
            name: name.into(),
        },
        Span::default(),
    )
}

pub fn call(callee: Expr, args: Vec<Argument>) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
        },
        Span::default(),
    )
}

pub fn arg(value: Expr) -> Argument {
    Argument { name: None, value }
}

/// `name: value`
pub fn named_arg(name: impl Into<String>, value: Expr) -> Argument {
    Argument {
        name: Some(name.into()),
        value,
    }
}

pub fn string(value: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Literal(Literal::String(value.into())), Span::default())
}

pub fn int(value: i64) -> Expr {
    Expr::new(
        ExprKind::Literal(Literal::Int { value, long: false }),
        Span::default(),
    )
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::new(
        ExprKind::Assign {
            op: AssignOp::Assign,
            target: Box::new(target),
            value: Box::new(value),
        },
        Span::default(),
    )
}

pub fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(kind, Span::default())
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    stmt(StmtKind::Expr(expr))
}

pub fn return_stmt(value: Option<Expr>) -> Stmt {
    stmt(StmtKind::Return(value))
}

pub fn goto(label: impl Into<String>) -> Stmt {
    stmt(StmtKind::Goto(label.into()))
}

pub fn labeled(label: impl Into<String>, inner: Stmt) -> Stmt {
    stmt(StmtKind::Labeled {
        label: label.into(),
        stmt: Box::new(inner),
    })
}

pub fn block_stmt(stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Block(Block {
        stmts,
        span: Span::default(),
    }))
}

/// `T name;` or `var name = init;`
pub fn local(ty: Option<TypeRef>, name: impl Into<String>, init: Option<Expr>) -> Stmt {
    stmt(StmtKind::Local(LocalDecl {
        ty,
        declarators: vec![Declarator {
            name: name.into(),
            init,
            span: Span::default(),
        }],
    }))
}

pub fn annotation(name: impl Into<String>) -> Annotation {
    Annotation {
        name: name.into(),
        args: Vec::new(),
        span: Span::default(),
    }
}

/// Parameter carrying the given annotations
pub fn param(annotations: Vec<Annotation>, ty: TypeRef, name: impl Into<String>) -> Param {
    Param {
        annotations,
        ty,
        name: name.into(),
        default: None,
        span: Span::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::{print_expr, print_stmt};

    #[test]
    fn test_built_nodes_print() {
        let call = call(
            member(ident("log"), "write"),
            vec![arg(string("hi")), named_arg("logger", ident("logger"))],
        );
        assert_eq!(print_expr(&call), "log.write(\"hi\", logger: logger)");

        let exit = labeled("f_exit", return_stmt(Some(ident("__result"))));
        assert_eq!(print_stmt(&exit), "f_exit: return __result;\n");
    }

    #[test]
    fn test_built_nodes_are_unnumbered() {
        assert!(ident("x").id.is_dummy());
        assert!(local(None, "x", Some(int(1))).id.is_dummy());
    }
}
