//! Post-order application of scheduled edits
//!
//! Children are rewritten before their parent, so a macro whose arguments
//! contain other macro calls or implicit calls expands over the already
//! rewritten arguments. Statement expansions replace the statement with a
//! block that the enclosing block flattens; local functions produced by
//! `@inline` land right before the statement that calls them.

use super::{ExprEdit, MemberEdit, Scheduled, StmtEdit, UnitEdits};
use crate::errors::{MacroError, SynthError};
use crate::macros::{
    expand_expression, expand_statements, inline_function, BoundVariable, Invocation, MacroTable,
};
use diagnostics::{Diagnostics, SourceSpan};
use fxhash::FxHashSet;
use parser::build::{ident, stmt};
use parser::visit::{self, VisitMut};
use parser::{
    number_nodes, Block, Expr, ExprKind, Member, MethodDecl, NodeId, Stmt, StmtKind, Unit,
};

/// Apply `edits` to `unit` and renumber it. Returns expansion failures and
/// one error per edit that found no node to apply to.
pub fn rewrite_unit(unit: &mut Unit, edits: UnitEdits, macros: &MacroTable) -> Diagnostics {
    let scheduled = edits.len();
    let mut rewriter = Rewriter {
        edits,
        macros,
        pending: Vec::new(),
        spliced: FxHashSet::default(),
        diagnostics: Diagnostics::new(),
    };
    rewriter.visit_unit(unit);

    let Rewriter {
        edits,
        mut diagnostics,
        ..
    } = rewriter;
    let mut leftovers: Vec<(NodeId, String, SourceSpan)> = Vec::new();
    leftovers.extend(
        edits
            .exprs
            .into_iter()
            .map(|(id, s)| (id, s.edit.describe(), s.span)),
    );
    leftovers.extend(
        edits
            .stmts
            .into_iter()
            .map(|(id, s)| (id, s.edit.describe().to_string(), s.span)),
    );
    leftovers.extend(
        edits
            .members
            .into_iter()
            .map(|(id, s)| (id, s.edit.describe(), s.span)),
    );
    leftovers.sort_by_key(|(id, _, _)| *id);
    for (id, description, span) in leftovers {
        diagnostics.push(
            SynthError::UnreplacedEdit {
                unit: unit.path.clone(),
                description: format!("{} at node {}", description, id.0),
                span,
            }
            .into(),
        );
    }

    number_nodes(unit);
    log::debug!(
        "rewrote {}: {} edits, {} diagnostics",
        unit.path,
        scheduled,
        diagnostics.len()
    );
    diagnostics
}

struct Rewriter<'a> {
    edits: UnitEdits,
    macros: &'a MacroTable,
    /// Local functions waiting to be inserted, one frame per statement of
    /// each enclosing block
    pending: Vec<Vec<MethodDecl>>,
    /// Statements replaced by a block whose statements belong to the parent
    spliced: FxHashSet<NodeId>,
    diagnostics: Diagnostics,
}

/// Receiver of a `target.name(...)` call
fn receiver(callee: &Expr) -> Option<&Expr> {
    match &callee.kind {
        ExprKind::Member { target, .. } => Some(target),
        _ => None,
    }
}

impl Rewriter<'_> {
    fn apply_expr(&mut self, expr: &mut Expr, scheduled: Scheduled<ExprEdit>) {
        let span = scheduled.span;
        match scheduled.edit {
            ExprEdit::Expand { macro_id } => {
                let Some(definition) = self.macros.get(macro_id) else {
                    self.edits.expr(expr.id, ExprEdit::Expand { macro_id }, span);
                    return;
                };
                let ExprKind::Call { callee, args } = &expr.kind else {
                    self.edits.expr(expr.id, ExprEdit::Expand { macro_id }, span);
                    return;
                };
                let invocation = Invocation {
                    args,
                    receiver: receiver(callee),
                    at: expr.span,
                    span,
                };
                match expand_expression(definition, &invocation) {
                    Ok(expansion) => *expr = expansion,
                    Err(error) => self.diagnostics.push(error.into()),
                }
            }
            ExprEdit::Inline { macro_id, name } => {
                let Some(definition) = self.macros.get(macro_id) else {
                    self.edits.expr(expr.id, ExprEdit::Inline { macro_id, name }, span);
                    return;
                };
                let at = expr.span;
                let ExprKind::Call { callee, .. } = &mut expr.kind else {
                    self.edits.expr(expr.id, ExprEdit::Inline { macro_id, name }, span);
                    return;
                };
                let Some(frame) = self.pending.last_mut() else {
                    self.diagnostics.push(
                        MacroError::UnsupportedPosition {
                            name: definition.name.clone(),
                            reason: "inline calls need an enclosing block".to_string(),
                            span,
                        }
                        .into(),
                    );
                    return;
                };
                frame.push(inline_function(definition, &name, at));
                let mut local = ident(name);
                local.span = callee.span;
                **callee = local;
            }
            ExprEdit::AppendArgs(extra) => match &mut expr.kind {
                ExprKind::Call { args, .. } | ExprKind::New { args, .. } => args.extend(extra),
                _ => self.edits.expr(expr.id, ExprEdit::AppendArgs(extra), span),
            },
        }
    }

    fn apply_stmt(&mut self, stmt: &mut Stmt, scheduled: Scheduled<StmtEdit>) {
        let span = scheduled.span;
        let (macro_id, call, variable) = match (&scheduled.edit, &stmt.kind) {
            (StmtEdit::ExpandStatement { macro_id }, StmtKind::Expr(call)) => {
                (*macro_id, call, None)
            }
            (StmtEdit::ExpandBinding { macro_id }, StmtKind::Local(local))
                if local.declarators.len() == 1 =>
            {
                let declarator = &local.declarators[0];
                let Some(init) = &declarator.init else {
                    self.edits.stmt(stmt.id, scheduled.edit, span);
                    return;
                };
                let variable = BoundVariable {
                    name: declarator.name.clone(),
                    ty: local.ty.clone(),
                };
                (*macro_id, init, Some(variable))
            }
            _ => {
                self.edits.stmt(stmt.id, scheduled.edit, span);
                return;
            }
        };

        let (Some(definition), ExprKind::Call { callee, args }) =
            (self.macros.get(macro_id), &call.kind)
        else {
            self.edits.stmt(stmt.id, scheduled.edit, span);
            return;
        };
        let invocation = Invocation {
            args,
            receiver: receiver(callee),
            at: stmt.span,
            span,
        };
        match expand_statements(definition, &invocation, variable.as_ref()) {
            Ok(stmts) => {
                stmt.kind = StmtKind::Block(Block {
                    stmts,
                    span: stmt.span,
                });
                self.spliced.insert(stmt.id);
            }
            Err(error) => self.diagnostics.push(error.into()),
        }
    }
}

impl VisitMut for Rewriter<'_> {
    fn visit_member(&mut self, member: &mut Member) {
        visit::walk_member_mut(self, member);
        let Some(scheduled) = self.edits.members.remove(&member.id()) else {
            return;
        };
        match (scheduled.edit, member) {
            (MemberEdit::AddParams(params), Member::Method(method)) => method.params.extend(params),
            (edit, member) => self.edits.member(member.id(), edit, scheduled.span),
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        let stmts = std::mem::take(&mut block.stmts);
        let mut out = Vec::with_capacity(stmts.len());
        for mut current in stmts {
            self.pending.push(Vec::new());
            self.visit_stmt(&mut current);
            let functions = self.pending.pop().unwrap_or_default();
            out.extend(
                functions
                    .into_iter()
                    .map(|f| stmt(StmtKind::LocalFunction(Box::new(f)))),
            );

            let spliced = self.spliced.remove(&current.id);
            match current.kind {
                StmtKind::Block(expansion) if spliced => out.extend(expansion.stmts),
                kind => out.push(Stmt { kind, ..current }),
            }
        }
        block.stmts = out;
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        visit::walk_stmt_mut(self, stmt);
        if let Some(scheduled) = self.edits.stmts.remove(&stmt.id) {
            self.apply_stmt(stmt, scheduled);
        }
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        visit::walk_expr_mut(self, expr);
        if let Some(scheduled) = self.edits.exprs.remove(&expr.id) {
            self.apply_expr(expr, scheduled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::{MacroDefinition, MacroKind};
    use crate::semantic::MethodId;
    use parser::build::{annotation, named_arg, param};
    use parser::visit::Visit;
    use parser::{parse_members, parse_unit, print_unit, TypeRef};

    fn definition(id: u32, kind: MacroKind, text: &str) -> MacroDefinition {
        let Some(Member::Method(decl)) = parse_members("M", text).unwrap().into_iter().next() else {
            panic!("expected a method");
        };
        MacroDefinition {
            method: MethodId::from_raw(id),
            name: decl.name.clone(),
            kind,
            decl,
            span: SourceSpan::unknown(),
        }
    }

    /// Ids of the first call expressions found, in document order
    fn calls(unit: &Unit) -> Vec<NodeId> {
        struct Calls(Vec<NodeId>);
        impl Visit for Calls {
            fn visit_expr(&mut self, expr: &Expr) {
                if matches!(expr.kind, ExprKind::Call { .. }) {
                    self.0.push(expr.id);
                }
                visit::walk_expr(self, expr);
            }
        }
        let mut found = Calls(Vec::new());
        found.visit_unit(unit);
        found.0
    }

    fn stmt_ids(unit: &Unit) -> Vec<NodeId> {
        struct Stmts(Vec<NodeId>);
        impl Visit for Stmts {
            fn visit_stmt(&mut self, stmt: &Stmt) {
                self.0.push(stmt.id);
                visit::walk_stmt(self, stmt);
            }
        }
        let mut found = Stmts(Vec::new());
        found.visit_unit(unit);
        found.0
    }

    #[test]
    fn test_nested_pattern_expands_inside_out() {
        let mut unit = parse_unit("a.lm", "class A { string f(string s) { return wrap(wrap(s)); } }")
            .unwrap();
        let macros: MacroTable = [definition(
            0,
            MacroKind::Pattern("\"[\" + ${x} + \"]\"".to_string()),
            "static string wrap(string x);",
        )]
        .into_iter()
        .collect();

        let mut edits = UnitEdits::new();
        for id in calls(&unit) {
            edits.expr(
                id,
                ExprEdit::Expand {
                    macro_id: MethodId::from_raw(0),
                },
                SourceSpan::unknown(),
            );
        }
        let diagnostics = rewrite_unit(&mut unit, edits, &macros);
        assert!(diagnostics.is_empty());
        assert!(print_unit(&unit).contains("return \"[\" + (\"[\" + s + \"]\") + \"]\";"));
    }

    #[test]
    fn test_statement_expansion_is_spliced() {
        let mut unit =
            parse_unit("a.lm", "class A { void f() { trace(\"go\"); run(); } }").unwrap();
        let macros: MacroTable = [definition(
            1,
            MacroKind::StatementPattern("log.write(${m}); log.flush();".to_string()),
            "static void trace(string m);",
        )]
        .into_iter()
        .collect();

        let first_stmt = stmt_ids(&unit)[0];
        let mut edits = UnitEdits::new();
        edits.stmt(
            first_stmt,
            StmtEdit::ExpandStatement {
                macro_id: MethodId::from_raw(1),
            },
            SourceSpan::unknown(),
        );
        assert!(rewrite_unit(&mut unit, edits, &macros).is_empty());
        let printed = print_unit(&unit);
        assert!(printed.contains("log.write(\"go\");\n        log.flush();\n        run();"));
    }

    #[test]
    fn test_inline_function_precedes_statement() {
        let mut unit =
            parse_unit("a.lm", "class A { int f(int v) { var y = 1; return twice(v) + y; } }")
                .unwrap();
        let macros: MacroTable = [definition(
            2,
            MacroKind::Inline,
            "static int twice(int x) { return x * 2; }",
        )]
        .into_iter()
        .collect();

        let call = calls(&unit)[0];
        let mut edits = UnitEdits::new();
        edits.expr(
            call,
            ExprEdit::Inline {
                macro_id: MethodId::from_raw(2),
                name: "twice_inline_1_43".to_string(),
            },
            SourceSpan::unknown(),
        );
        assert!(rewrite_unit(&mut unit, edits, &macros).is_empty());

        let printed = print_unit(&unit);
        let function = printed.find("int twice_inline_1_43(int x) {").unwrap();
        let call = printed.find("return twice_inline_1_43(v) + y;").unwrap();
        assert!(function < call);
        assert!(printed.find("var y = 1;").unwrap() < function);
    }

    #[test]
    fn test_pass_through_params_and_arguments() {
        let mut unit = parse_unit(
            "a.lm",
            "class A { @pass_through void f() { log(\"x\"); } void log(string m, @implicit Logger logger) { } }",
        )
        .unwrap();
        let method = match &unit.items[0] {
            parser::Item::Type(decl) => decl.members[0].id(),
            _ => unreachable!(),
        };
        let mut edits = UnitEdits::new();
        edits.member(
            method,
            MemberEdit::AddParams(vec![param(
                vec![annotation("implicit")],
                TypeRef::simple("Logger"),
                "logger",
            )]),
            SourceSpan::unknown(),
        );
        edits.append_args(
            calls(&unit)[0],
            vec![named_arg("logger", ident("logger"))],
            SourceSpan::unknown(),
        );
        assert!(rewrite_unit(&mut unit, edits, &MacroTable::new()).is_empty());

        let printed = print_unit(&unit);
        assert!(printed.contains("void f(@implicit Logger logger) {"));
        assert!(printed.contains("log(\"x\", logger: logger);"));
    }

    #[test]
    fn test_unapplied_edits_are_reported() {
        let mut unit = parse_unit("a.lm", "class A { }").unwrap();
        let mut edits = UnitEdits::new();
        edits.append_args(NodeId(999), Vec::new(), SourceSpan::unknown());
        let diagnostics = rewrite_unit(&mut unit, edits, &MacroTable::new());
        assert_eq!(diagnostics.with_code("E9001").count(), 1);
    }
}
