//! Expanding one macro invocation
//!
//! Template macros bind the call's arguments to parameter names, substitute
//! and reparse the result. Inline macros turn a copy of the method body into
//! a local function whose returns jump to a single exit label.

use super::template::substitute;
use super::MacroDefinition;
use crate::errors::MacroError;
use diagnostics::SourceSpan;
use parser::build::{assign, block_stmt, expr_stmt, goto, ident, labeled, local, return_stmt};
use parser::visit::{self, VisitMut};
use parser::{
    parse_expression, parse_statements, print_expr, Argument, Body, Expr, ExprKind, MethodDecl,
    Span, Stmt, StmtKind, TypeRef, UnaryOp,
};

/// Name of the result local inside an inlined body
const RESULT_LOCAL: &str = "__result";

/// One call being expanded
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub args: &'a [Argument],
    /// Target of a `target.name(...)` callee, rendered for `${this}`
    pub receiver: Option<&'a Expr>,
    /// Span given to every node of the expansion
    pub at: Span,
    pub span: SourceSpan,
}

/// Variable introduced by a binding-pattern declaration
#[derive(Debug, Clone)]
pub struct BoundVariable {
    pub name: String,
    /// `None` for `var`
    pub ty: Option<TypeRef>,
}

/// Source text of each parameter's argument, in parameter order
pub fn bind_arguments(
    definition: &MacroDefinition,
    invocation: &Invocation<'_>,
) -> Result<Vec<(String, String)>, MacroError> {
    let params = &definition.decl.params;
    let mut bound: Vec<Option<String>> = vec![None; params.len()];

    let mut position = 0;
    for argument in invocation.args {
        let index = match &argument.name {
            Some(name) => params.iter().position(|p| &p.name == name),
            None => {
                position += 1;
                Some(position - 1).filter(|&i| i < params.len())
            }
        };
        let Some(index) = index else {
            return Err(MacroError::InvalidExpansion {
                name: definition.name.clone(),
                reason: match &argument.name {
                    Some(name) => format!("no parameter named '{}'", name),
                    None => format!("too many arguments, expected {}", params.len()),
                },
                span: invocation.span,
            });
        };
        bound[index] = Some(render(&argument.value));
    }

    params
        .iter()
        .zip(bound)
        .map(|(param, value)| {
            let value = match (value, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) if is_expandable_default(default) => render(default),
                (None, Some(_)) => {
                    return Err(MacroError::UnsupportedDefault {
                        name: definition.name.clone(),
                        param: param.name.clone(),
                        span: invocation.span,
                    })
                }
                (None, None) => {
                    return Err(MacroError::InvalidExpansion {
                        name: definition.name.clone(),
                        reason: format!("missing argument for '{}'", param.name),
                        span: invocation.span,
                    })
                }
            };
            Ok((param.name.clone(), value))
        })
        .collect()
}

/// Argument text, parenthesized unless it is a primary expression
fn render(expr: &Expr) -> String {
    let text = print_expr(expr);
    if expr.is_primary() {
        text
    } else {
        format!("({})", text)
    }
}

/// Literals, casts and `default` expressions can be copied into a template
fn is_expandable_default(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Default(_) | ExprKind::Cast { .. } => true,
        ExprKind::Unary {
            op: UnaryOp::Neg,
            expr,
        } => matches!(expr.kind, ExprKind::Literal(_)),
        ExprKind::Paren(inner) => is_expandable_default(inner),
        _ => false,
    }
}

fn expand_text(
    definition: &MacroDefinition,
    invocation: &Invocation<'_>,
    variable: Option<&BoundVariable>,
) -> Result<String, MacroError> {
    let template = definition.kind.template().unwrap_or_default();
    let bindings = bind_arguments(definition, invocation)?;
    let lookup = |name: &str| -> Option<String> {
        if let Some((_, value)) = bindings.iter().find(|(param, _)| param == name) {
            return Some(value.clone());
        }
        match name {
            "this" => Some(invocation.receiver.map(render).unwrap_or_else(|| "this".to_string())),
            "varName" => variable.map(|v| v.name.clone()),
            "varType" => variable.map(|v| {
                v.ty.as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "var".to_string())
            }),
            _ => {
                let index: usize = name.strip_prefix("expr")?.parse().ok()?;
                bindings.get(index).map(|(_, value)| value.clone())
            }
        }
    };
    substitute(template, lookup).map_err(|reason| MacroError::InvalidExpansion {
        name: definition.name.clone(),
        reason,
        span: invocation.span,
    })
}

/// Expand a `@pattern` invocation into one expression
pub fn expand_expression(
    definition: &MacroDefinition,
    invocation: &Invocation<'_>,
) -> Result<Expr, MacroError> {
    let text = expand_text(definition, invocation, None)?;
    let mut expr = parse_expression(&text).map_err(|_| MacroError::InvalidExpansion {
        name: definition.name.clone(),
        reason: format!("`{}` is not an expression", text),
        span: invocation.span,
    })?;
    Respan(invocation.at).visit_expr(&mut expr);
    log::trace!("{} expanded to {}", definition.name, text);
    Ok(expr)
}

/// Expand a `@statement_pattern` or `@binding_pattern` invocation
pub fn expand_statements(
    definition: &MacroDefinition,
    invocation: &Invocation<'_>,
    variable: Option<&BoundVariable>,
) -> Result<Vec<Stmt>, MacroError> {
    let text = expand_text(definition, invocation, variable)?;
    let mut stmts = parse_statements(&text).map_err(|_| MacroError::InvalidExpansion {
        name: definition.name.clone(),
        reason: format!("`{}` is not a statement list", text),
        span: invocation.span,
    })?;
    let mut respan = Respan(invocation.at);
    for stmt in &mut stmts {
        respan.visit_stmt(stmt);
    }
    log::trace!("{} expanded to {} statements", definition.name, stmts.len());
    Ok(stmts)
}

/// Copy of an `@inline` method as a local function named `name`.
///
/// Every `return` assigns the result local and jumps to `<name>_exit`, where
/// the single real return sits. Nested local functions keep their returns.
pub fn inline_function(definition: &MacroDefinition, name: &str, at: Span) -> MethodDecl {
    let decl = &definition.decl;
    let is_void = decl.return_type.is_void();
    let exit = format!("{}_exit", name);

    let mut body = match &decl.body {
        Some(Body::Block(block)) => block.stmts.clone(),
        Some(Body::Expr(expr)) if is_void => vec![expr_stmt(expr.clone())],
        Some(Body::Expr(expr)) => vec![return_stmt(Some(expr.clone()))],
        None => Vec::new(),
    };
    let mut returns = ReturnsToExit {
        exit: &exit,
        is_void,
    };
    for stmt in &mut body {
        returns.visit_stmt(stmt);
    }

    let mut stmts = Vec::with_capacity(3);
    if !is_void {
        stmts.push(local(
            Some(decl.return_type.clone()),
            RESULT_LOCAL,
            Some(Expr::new(ExprKind::Default(None), Span::default())),
        ));
    }
    stmts.push(block_stmt(body));
    let result = (!is_void).then(|| ident(RESULT_LOCAL));
    stmts.push(labeled(exit.clone(), return_stmt(result)));

    let mut function = MethodDecl {
        id: decl.id,
        annotations: Vec::new(),
        modifiers: Vec::new(),
        return_type: decl.return_type.clone(),
        name: name.to_string(),
        type_params: decl.type_params.clone(),
        params: decl
            .params
            .iter()
            .cloned()
            .map(|mut p| {
                p.annotations.clear();
                p
            })
            .collect(),
        body: Some(Body::Block(parser::Block {
            stmts,
            span: at,
        })),
        span: at,
    };
    Respan(at).visit_local_function(&mut function);
    function
}

struct ReturnsToExit<'a> {
    exit: &'a str,
    is_void: bool,
}

impl VisitMut for ReturnsToExit<'_> {
    fn visit_local_function(&mut self, _method: &mut MethodDecl) {}

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        let StmtKind::Return(value) = &mut stmt.kind else {
            visit::walk_stmt_mut(self, stmt);
            return;
        };
        let replacement = match value.take() {
            Some(value) if !self.is_void => {
                block_stmt(vec![expr_stmt(assign(ident(RESULT_LOCAL), value)), goto(self.exit)])
            }
            // `return e;` in a void body keeps `e` for its effects
            Some(value) => block_stmt(vec![expr_stmt(value), goto(self.exit)]),
            None => goto(self.exit),
        };
        stmt.kind = replacement.kind;
    }
}

/// Points every node at the invocation
struct Respan(Span);

impl VisitMut for Respan {
    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        stmt.span = self.0;
        visit::walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        expr.span = self.0;
        visit::walk_expr_mut(self, expr);
    }

    fn visit_local_function(&mut self, method: &mut MethodDecl) {
        method.span = self.0;
        visit::walk_method_mut(self, method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroKind;
    use crate::semantic::MethodId;
    use parser::{parse_members, print_stmt, Member};

    fn definition(kind: MacroKind, method: &str) -> MacroDefinition {
        let members = parse_members("Text", method).expect("method should parse");
        let Some(Member::Method(decl)) = members.into_iter().next() else {
            panic!("expected a method");
        };
        MacroDefinition {
            method: MethodId::from_raw(0),
            name: decl.name.clone(),
            kind,
            decl,
            span: SourceSpan::unknown(),
        }
    }

    fn args(text: &str) -> Vec<Argument> {
        let call = parse_expression(text).expect("call should parse");
        match call.kind {
            ExprKind::Call { args, .. } => args,
            _ => panic!("expected a call"),
        }
    }

    fn invocation(args: &[Argument]) -> Invocation<'_> {
        Invocation {
            args,
            receiver: None,
            at: Span::new(3, 9),
            span: SourceSpan::unknown(),
        }
    }

    #[test]
    fn test_pattern_splices_argument_into_string() {
        let greet = definition(
            MacroKind::Pattern("\"Hello, ${name}!\"".to_string()),
            "static string greet(string name);",
        );
        let args = args("greet(user.name)");
        let expr = expand_expression(&greet, &invocation(&args)).unwrap();
        assert_eq!(print_expr(&expr), "\"Hello, \" + user.name + \"!\"");
        assert_eq!(expr.span, Span::new(3, 9));
    }

    #[test]
    fn test_compound_arguments_are_parenthesized() {
        let square = definition(
            MacroKind::Pattern("${expr0} * ${expr0}".to_string()),
            "static int square(int x);",
        );
        let args = args("square(a + 1)");
        let expr = expand_expression(&square, &invocation(&args)).unwrap();
        assert_eq!(print_expr(&expr), "(a + 1) * (a + 1)");
    }

    #[test]
    fn test_defaults_fill_omitted_arguments() {
        let greet = definition(
            MacroKind::Pattern("${greeting} + ${name}".to_string()),
            "static string greet(string name, string greeting = \"Hi \");",
        );
        let args = args("greet(\"Ann\")");
        let bound = bind_arguments(&greet, &invocation(&args)).unwrap();
        assert_eq!(bound[1], ("greeting".to_string(), "\"Hi \"".to_string()));

        let greet = definition(
            MacroKind::Pattern("${name}".to_string()),
            "static string greet(string name, string suffix = Text.bang());",
        );
        let err = bind_arguments(&greet, &invocation(&args)).unwrap_err();
        assert_eq!(err.error_code(), crate::error_codes::UNSUPPORTED_DEFAULT_VALUE);
    }

    #[test]
    fn test_unparsable_expansion_is_reported() {
        let broken = definition(
            MacroKind::Pattern("${x} +".to_string()),
            "static int broken(int x);",
        );
        let args = args("broken(1)");
        let err = expand_expression(&broken, &invocation(&args)).unwrap_err();
        assert_eq!(err.error_code(), crate::error_codes::INVALID_MACRO_EXPANSION);
    }

    #[test]
    fn test_binding_pattern_names_variable() {
        let fetch = definition(
            MacroKind::BindingPattern("${varType} ${varName} = cache.get(${key});".to_string()),
            "static string fetch(string key);",
        );
        let args = args("fetch(\"k\")");
        let variable = BoundVariable {
            name: "value".to_string(),
            ty: Some(TypeRef::simple("string")),
        };
        let stmts = expand_statements(&fetch, &invocation(&args), Some(&variable)).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(print_stmt(&stmts[0]), "string value = cache.get(\"k\");\n");
    }

    #[test]
    fn test_inline_returns_jump_to_exit() {
        let clamp = definition(
            MacroKind::Inline,
            "static int clamp(int x) { if (x < 0) { return 0; } return x; }",
        );
        let function = inline_function(&clamp, "clamp_inline_4_9", Span::new(0, 1));
        let text = print_stmt(&parser::build::stmt(StmtKind::LocalFunction(Box::new(function))));
        assert!(text.contains("int __result = default;"));
        assert!(text.contains("__result = 0;"));
        assert_eq!(text.matches("goto clamp_inline_4_9_exit;").count(), 2);
        assert!(text.contains("clamp_inline_4_9_exit: return __result;"));
    }
}
