//! Statement and block parsing

use nom::{Parser, error::context};

use crate::ast::*;
use crate::parser::{
    PResult, annotations, at_keyword, at_symbol, fail, identifier, keyword, make_span,
    method_rest, modifiers, position, symbol, type_ref, ws,
};
use crate::parser_expr::expression;

/// `{ stmt* }`
pub fn block<'a>(full: &'a str, input: &'a str) -> PResult<'a, Block> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut input, _) = context("expected '{'", symbol("{")).parse(input)?;

    let mut stmts = Vec::new();
    while !at_symbol(input, "}") {
        let (rest, stmt) = statement(full, input)?;
        stmts.push(stmt);
        input = rest;
    }
    let (input, _) = context("expected '}' to close block", symbol("}")).parse(input)?;

    Ok((
        input,
        Block {
            stmts,
            span: make_span(full, start, input),
        },
    ))
}

/// Any statement
pub fn statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    if input.is_empty() {
        return fail(input);
    }

    if input.starts_with('{') {
        let (rest, body) = block(full, input)?;
        return Ok((rest, Stmt::new(StmtKind::Block(body), make_span(full, start, rest))));
    }
    if input.starts_with(';') {
        let rest = &input[1..];
        return Ok((rest, Stmt::new(StmtKind::Empty, make_span(full, start, rest))));
    }

    let (rest, kind) = if at_keyword(input, "return") {
        return_stmt(full, input)?
    } else if at_keyword(input, "if") {
        if_stmt(full, input)?
    } else if at_keyword(input, "while") {
        while_stmt(full, input)?
    } else if at_keyword(input, "foreach") {
        foreach_stmt(full, input)?
    } else if at_keyword(input, "throw") {
        let (rest, _) = keyword("throw")(input)?;
        let (rest, value) = context("expected expression after 'throw'", |i| {
            expression(full, i)
        })
        .parse(rest)?;
        let (rest, _) = context("expected ';' after throw", symbol(";")).parse(rest)?;
        (rest, StmtKind::Throw(value))
    } else if at_keyword(input, "break") {
        let (rest, _) = keyword("break")(input)?;
        let (rest, _) = context("expected ';' after break", symbol(";")).parse(rest)?;
        (rest, StmtKind::Break)
    } else if at_keyword(input, "continue") {
        let (rest, _) = keyword("continue")(input)?;
        let (rest, _) = context("expected ';' after continue", symbol(";")).parse(rest)?;
        (rest, StmtKind::Continue)
    } else if at_keyword(input, "goto") {
        let (rest, _) = keyword("goto")(input)?;
        let (rest, label) = context("expected label after 'goto'", identifier).parse(rest)?;
        let (rest, _) = context("expected ';' after goto", symbol(";")).parse(rest)?;
        (rest, StmtKind::Goto(label))
    } else if starts_label(input) {
        labeled(full, input)?
    } else {
        declaration_or_expression(full, input)?
    };

    Ok((rest, Stmt::new(kind, make_span(full, start, rest))))
}

fn return_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("return")(input)?;
    if at_symbol(input, ";") {
        let (input, _) = symbol(";")(input)?;
        return Ok((input, StmtKind::Return(None)));
    }
    let (input, value) = expression(full, input)?;
    let (input, _) = context("expected ';' after return value", symbol(";")).parse(input)?;
    Ok((input, StmtKind::Return(Some(value))))
}

fn if_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("if")(input)?;
    let (input, _) = context("expected '(' after 'if'", symbol("(")).parse(input)?;
    let (input, cond) = expression(full, input)?;
    let (input, _) = context("expected ')' after condition", symbol(")")).parse(input)?;
    let (input, then_branch) = statement(full, input)?;

    let (input, else_branch) = if at_keyword(input, "else") {
        let (input, _) = keyword("else")(input)?;
        let (input, stmt) = statement(full, input)?;
        (input, Some(Box::new(stmt)))
    } else {
        (input, None)
    };

    Ok((
        input,
        StmtKind::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch,
        },
    ))
}

fn while_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("while")(input)?;
    let (input, _) = context("expected '(' after 'while'", symbol("(")).parse(input)?;
    let (input, cond) = expression(full, input)?;
    let (input, _) = context("expected ')' after condition", symbol(")")).parse(input)?;
    let (input, body) = statement(full, input)?;
    Ok((
        input,
        StmtKind::While {
            cond,
            body: Box::new(body),
        },
    ))
}

/// `foreach (var x in items) body`
fn foreach_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("foreach")(input)?;
    let (input, _) = context("expected '(' after 'foreach'", symbol("(")).parse(input)?;
    let (input, ty) = context("expected loop variable type", |i| type_ref(full, i)).parse(input)?;
    let (input, name) = context("expected loop variable name", identifier).parse(input)?;
    let (input, _) = context("expected 'in'", keyword("in")).parse(input)?;
    let (input, iterable) = expression(full, input)?;
    let (input, _) = context("expected ')' after foreach header", symbol(")")).parse(input)?;
    let (input, body) = statement(full, input)?;
    Ok((
        input,
        StmtKind::ForEach {
            ty: explicit_type(ty),
            name,
            iterable,
            body: Box::new(body),
        },
    ))
}

/// `var` is written as a type but means "inferred"
fn explicit_type(ty: TypeRef) -> Option<TypeRef> {
    if ty.name == "var" && ty.args.is_empty() && !ty.nullable && ty.array_rank == 0 {
        None
    } else {
        Some(ty)
    }
}

/// Whether the input starts with `identifier :`
fn starts_label(input: &str) -> bool {
    match identifier(input) {
        Ok((after, _)) => at_symbol(after, ":"),
        Err(_) => false,
    }
}

/// `label: stmt`
fn labeled<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, label) = identifier(input)?;
    let (input, _) = symbol(":")(input)?;
    let (input, stmt) = statement(full, input)?;
    Ok((
        input,
        StmtKind::Labeled {
            label,
            stmt: Box::new(stmt),
        },
    ))
}

/// Local function, local variable declaration or expression statement,
/// tried in that order; the attempt that got furthest reports the error
fn declaration_or_expression<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let function_err = match local_function(full, input) {
        Ok(result) => return Ok(result),
        Err(nom::Err::Error(e)) => e,
        Err(e) => return Err(e),
    };
    let local_err = match local_decl(full, input) {
        Ok(result) => return Ok(result),
        Err(nom::Err::Error(e)) => e,
        Err(e) => return Err(e),
    };

    match expression_stmt(full, input) {
        Ok(result) => Ok(result),
        Err(nom::Err::Error(e)) => {
            use nom::error::ParseError;
            Err(nom::Err::Error(e.or(local_err).or(function_err)))
        }
        Err(e) => Err(e),
    }
}

fn local_function<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, annotations) = annotations(full, input)?;
    let (input, modifiers) = modifiers(input)?;
    let (input, return_type) = type_ref(full, input)?;
    let (input, name) = identifier(input)?;
    if !at_symbol(input, "(") && !at_symbol(input, "<") {
        return fail(input);
    }
    let (input, method) =
        method_rest(full, input, start, annotations, modifiers, return_type, name)?;
    if method.body.is_none() {
        return fail(input);
    }
    Ok((input, StmtKind::LocalFunction(Box::new(method))))
}

fn local_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, ty) = type_ref(full, input)?;
    let mut input = input;
    let mut declarators = Vec::new();

    loop {
        let (rest, _) = ws(input)?;
        let start = position(full, rest);
        let (rest, name) = identifier(rest)?;
        let (rest, init) = if at_symbol(rest, "=") && !at_symbol(rest, "==") {
            let (rest, _) = symbol("=")(rest)?;
            let (rest, init) = expression(full, rest)?;
            (rest, Some(init))
        } else {
            (rest, None)
        };
        declarators.push(Declarator {
            name,
            init,
            span: make_span(full, start, rest),
        });
        input = rest;
        if at_symbol(input, ",") {
            input = symbol(",")(input)?.0;
        } else {
            break;
        }
    }

    let (input, _) = context("expected ';' after local declaration", symbol(";")).parse(input)?;
    Ok((
        input,
        StmtKind::Local(LocalDecl {
            ty: explicit_type(ty),
            declarators,
        }),
    ))
}

fn expression_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, value) = expression(full, input)?;
    let (input, _) = context("expected ';' after expression", symbol(";")).parse(input)?;
    Ok((input, StmtKind::Expr(value)))
}
