//! Expression parsing with precedence climbing
//!
//! Levels from loosest to tightest follow `ast::prec`: assignment,
//! conditional, the binary operators, unary/cast, postfix and primary.

use nom::{
    Parser,
    character::complete::{char, digit1, one_of},
    combinator::opt,
    error::{ContextError, ErrorKind, context},
    sequence::pair,
};

use crate::ast::*;
use crate::custom_error::ContextualError;
use crate::parser::{
    PResult, at_keyword, at_symbol, fail, identifier, is_keyword, keyword, make_span, position,
    symbol, type_ref, type_ref_no_nullable, ws,
};

/// Binary operator table, longest spelling first
const BINARY_OPERATORS: &[(&str, BinaryOp)] = &[
    ("??", BinaryOp::Coalesce),
    ("||", BinaryOp::Or),
    ("&&", BinaryOp::And),
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::NotEq),
    ("<=", BinaryOp::Le),
    (">=", BinaryOp::Ge),
    ("<<", BinaryOp::Shl),
    (">>", BinaryOp::Shr),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
    ("|", BinaryOp::BitOr),
    ("^", BinaryOp::BitXor),
    ("&", BinaryOp::BitAnd),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
];

const ASSIGN_OPERATORS: &[(&str, AssignOp)] = &[
    ("??=", AssignOp::Coalesce),
    ("+=", AssignOp::Add),
    ("-=", AssignOp::Sub),
    ("*=", AssignOp::Mul),
    ("/=", AssignOp::Div),
];

const UNARY_OPERATORS: &[(&str, UnaryOp)] = &[
    ("!", UnaryOp::Not),
    ("-", UnaryOp::Neg),
    ("~", UnaryOp::BitNot),
];

/// Full expression, assignment included
pub fn expression<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, target) = conditional(full, input)?;

    if let Ok((rest, op)) = assign_operator(input) {
        let (rest, value) = context("expected expression after assignment operator", |i| {
            expression(full, i)
        })
        .parse(rest)?;
        return Ok((
            rest,
            Expr::new(
                ExprKind::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                make_span(full, start, rest),
            ),
        ));
    }

    Ok((input, target))
}

fn assign_operator(input: &str) -> PResult<'_, AssignOp> {
    let (input, _) = ws(input)?;
    for (sym, op) in ASSIGN_OPERATORS {
        if let Some(rest) = input.strip_prefix(sym) {
            return Ok((rest, *op));
        }
    }
    if input.starts_with('=') && !input.starts_with("==") && !input.starts_with("=>") {
        return Ok((&input[1..], AssignOp::Assign));
    }
    fail(input)
}

/// `cond ? a : b`
fn conditional<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, cond) = binary(full, input, prec::COALESCE)?;

    if !at_symbol(input, "?") || at_symbol(input, "??") {
        return Ok((input, cond));
    }

    let (input, _) = symbol("?")(input)?;
    let (input, then_expr) =
        context("expected expression after '?'", |i| conditional(full, i)).parse(input)?;
    let (input, _) = context("expected ':' in conditional expression", symbol(":")).parse(input)?;
    let (input, else_expr) =
        context("expected expression after ':'", |i| conditional(full, i)).parse(input)?;

    Ok((
        input,
        Expr::new(
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            make_span(full, start, input),
        ),
    ))
}

fn binary_operator(input: &str) -> PResult<'_, BinaryOp> {
    let (input, _) = ws(input)?;
    for (sym, op) in BINARY_OPERATORS {
        if let Some(rest) = input.strip_prefix(sym) {
            // compound assignment belongs to the assignment level
            let comparison = matches!(
                op,
                BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Le | BinaryOp::Ge
            );
            if rest.starts_with('=') && !comparison {
                return fail(input);
            }
            return Ok((rest, *op));
        }
    }
    fail(input)
}

/// Binary operators at or above `min_prec`
fn binary<'a>(full: &'a str, input: &'a str, min_prec: u8) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut input, mut left) = unary(full, input)?;

    loop {
        if prec::RELATIONAL >= min_prec && at_keyword(input, "is") {
            let (rest, _) = keyword("is")(input)?;
            let (rest, ty) = context("expected type after 'is'", |i| {
                type_ref_no_nullable(full, i)
            })
            .parse(rest)?;
            let (rest, binding) = opt(identifier).parse(rest)?;
            left = Expr::new(
                ExprKind::Is {
                    expr: Box::new(left),
                    ty,
                    binding,
                },
                make_span(full, start, rest),
            );
            input = rest;
            continue;
        }

        let Ok((rest, op)) = binary_operator(input) else {
            break;
        };
        let op_prec = op.precedence();
        if op_prec < min_prec {
            break;
        }
        let next_min = if op.is_right_associative() {
            op_prec
        } else {
            op_prec + 1
        };
        let (rest, right) = context("expected expression after operator", |i| {
            binary(full, i, next_min)
        })
        .parse(rest)?;
        left = Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            make_span(full, start, rest),
        );
        input = rest;
    }

    Ok((input, left))
}

/// Prefix operators and casts
fn unary<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    for (sym, op) in UNARY_OPERATORS {
        if let Some(rest) = input.strip_prefix(sym) {
            let (rest, operand) = unary(full, rest)?;
            return Ok((
                rest,
                Expr::new(
                    ExprKind::Unary {
                        op: *op,
                        expr: Box::new(operand),
                    },
                    make_span(full, start, rest),
                ),
            ));
        }
    }

    if input.starts_with('(') {
        if let Ok(result) = cast(full, input) {
            return Ok(result);
        }
    }

    postfix(full, input)
}

/// `(T)expr`, only when the parenthesized part is followed by something that
/// can start an operand
fn cast<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let start = position(full, input);
    let (rest, _) = char('(')(input)?;
    let (rest, ty) = type_ref(full, rest)?;
    let (rest, _) = symbol(")")(rest)?;
    if !starts_cast_operand(rest) {
        return fail(input);
    }
    let (rest, operand) = unary(full, rest)?;
    Ok((
        rest,
        Expr::new(
            ExprKind::Cast {
                ty,
                expr: Box::new(operand),
            },
            make_span(full, start, rest),
        ),
    ))
}

fn starts_cast_operand(input: &str) -> bool {
    let Ok((rest, _)) = ws(input) else {
        return false;
    };
    match rest.chars().next() {
        Some(c) if c.is_ascii_digit() || matches!(c, '"' | '(' | '!' | '~') => true,
        Some(c) if c.is_alphabetic() || c == '_' => {
            let word = rest
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .next()
                .unwrap_or("");
            !is_keyword(word)
                || matches!(word, "this" | "new" | "default" | "true" | "false" | "null")
        }
        _ => false,
    }
}

/// Member access, calls and indexing
fn postfix<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (mut input, mut expr) = primary(full, input)?;

    loop {
        if at_symbol(input, ".") {
            let (rest, _) = symbol(".")(input)?;
            let (rest, name) = context("expected member name after '.'", identifier).parse(rest)?;
            expr = Expr::new(
                ExprKind::Member {
                    target: Box::new(expr),
                    name,
                },
                make_span(full, start, rest),
            );
            input = rest;
        } else if at_symbol(input, "(") {
            let (rest, args) = arguments(full, input)?;
            expr = Expr::new(
                ExprKind::Call {
                    callee: Box::new(expr),
                    args,
                },
                make_span(full, start, rest),
            );
            input = rest;
        } else if at_symbol(input, "[") {
            let (rest, _) = symbol("[")(input)?;
            let (rest, index) = expression(full, rest)?;
            let (rest, _) = context("expected ']'", symbol("]")).parse(rest)?;
            expr = Expr::new(
                ExprKind::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                },
                make_span(full, start, rest),
            );
            input = rest;
        } else {
            break;
        }
    }

    Ok((input, expr))
}

fn primary<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);

    let (rest, kind) = if input.starts_with(|c: char| c.is_ascii_digit()) {
        let (rest, literal) = number(input)?;
        (rest, ExprKind::Literal(literal))
    } else if input.starts_with('"') {
        let (rest, value) = string_literal(input)?;
        (rest, ExprKind::Literal(Literal::String(value)))
    } else if input.starts_with('(') {
        let (rest, _) = char('(')(input)?;
        let (rest, inner) = expression(full, rest)?;
        let (rest, _) = context("expected ')'", symbol(")")).parse(rest)?;
        (rest, ExprKind::Paren(Box::new(inner)))
    } else if let Ok((rest, _)) = keyword("true")(input) {
        (rest, ExprKind::Literal(Literal::Bool(true)))
    } else if let Ok((rest, _)) = keyword("false")(input) {
        (rest, ExprKind::Literal(Literal::Bool(false)))
    } else if let Ok((rest, _)) = keyword("null")(input) {
        (rest, ExprKind::Literal(Literal::Null))
    } else if let Ok((rest, _)) = keyword("this")(input) {
        (rest, ExprKind::This)
    } else if let Ok((rest, _)) = keyword("new")(input) {
        let (rest, ty) = context("expected type after 'new'", |i| type_ref(full, i)).parse(rest)?;
        let (rest, args) = arguments(full, rest)?;
        (rest, ExprKind::New { ty, args })
    } else if let Ok((rest, _)) = keyword("default")(input) {
        if at_symbol(rest, "(") {
            let (rest, _) = symbol("(")(rest)?;
            let (rest, ty) = type_ref(full, rest)?;
            let (rest, _) = context("expected ')' after default type", symbol(")")).parse(rest)?;
            (rest, ExprKind::Default(Some(ty)))
        } else {
            (rest, ExprKind::Default(None))
        }
    } else {
        let (rest, name) = context("expected expression", identifier).parse(input)?;
        (rest, ExprKind::Ident(name))
    };

    Ok((rest, Expr::new(kind, make_span(full, start, rest))))
}

/// Integer, long (`10L`) or floating-point literal
fn number(input: &str) -> PResult<'_, Literal> {
    let (rest, digits) = digit1(input)?;

    let has_fraction = rest.starts_with('.')
        && rest[1..].starts_with(|c: char| c.is_ascii_digit());
    if has_fraction {
        let (rest, _) = pair(char('.'), digit1).parse(rest)?;
        let (rest, _) = opt(one_of("fdmFDM")).parse(rest)?;
        let text = &input[..input.len() - rest.len()];
        return Ok((rest, Literal::Float(text.to_string())));
    }
    if rest.starts_with(['f', 'd', 'm', 'F', 'D', 'M']) {
        let rest = &rest[1..];
        let text = &input[..input.len() - rest.len()];
        return Ok((rest, Literal::Float(text.to_string())));
    }

    let value = digits.parse::<i64>().map_err(|_| {
        nom::Err::Failure(ContextualError::add_context(
            input,
            "integer literal out of range",
            ContextualError::new(input, ErrorKind::Digit),
        ))
    })?;
    match rest.strip_prefix(['L', 'l']) {
        Some(rest) => Ok((rest, Literal::Int { value, long: true })),
        None => Ok((rest, Literal::Int { value, long: false })),
    }
}

/// Double-quoted string with C-style escapes; returns the unescaped value
pub fn string_literal(input: &str) -> PResult<'_, String> {
    let (mut rest, _) = char('"')(input)?;
    let mut value = String::new();

    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None | Some('\n') => {
                return Err(nom::Err::Failure(ContextualError::add_context(
                    rest,
                    "unterminated string literal",
                    ContextualError::new(rest, ErrorKind::Char),
                )));
            }
            Some('"') => return Ok((&rest[1..], value)),
            Some('\\') => {
                let escaped = match chars.next() {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('r') => '\r',
                    Some('0') => '\0',
                    Some('\\') => '\\',
                    Some('"') => '"',
                    Some('\'') => '\'',
                    _ => {
                        return Err(nom::Err::Failure(ContextualError::add_context(
                            rest,
                            "unknown escape sequence",
                            ContextualError::new(rest, ErrorKind::Escaped),
                        )));
                    }
                };
                value.push(escaped);
                rest = &rest[2..];
            }
            Some(c) => {
                value.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

/// Parenthesized argument list with optional `name:` labels
pub fn arguments<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<Argument>> {
    let (mut input, _) = symbol("(")(input)?;
    let mut args = Vec::new();

    if !at_symbol(input, ")") {
        loop {
            let (rest, arg) = argument(full, input)?;
            args.push(arg);
            input = rest;
            if at_symbol(input, ",") {
                input = symbol(",")(input)?.0;
            } else {
                break;
            }
        }
    }

    let (input, _) = context("expected ')' after arguments", symbol(")")).parse(input)?;
    Ok((input, args))
}

fn argument<'a>(full: &'a str, input: &'a str) -> PResult<'a, Argument> {
    if let Ok((after, name)) = identifier(input) {
        if at_symbol(after, ":") {
            let (rest, _) = symbol(":")(after)?;
            let (rest, value) = expression(full, rest)?;
            return Ok((
                rest,
                Argument {
                    name: Some(name),
                    value,
                },
            ));
        }
    }
    let (rest, value) = expression(full, input)?;
    Ok((rest, Argument { name: None, value }))
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse_expression;

    fn parse(text: &str) -> Expr {
        parse_expression(text).expect("expression should parse")
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * c");
        match expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_coalesce_is_right_associative() {
        let expr = parse("a ?? b ?? c");
        match expr.kind {
            ExprKind::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Coalesce);
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Coalesce, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hash_combination() {
        let expr = parse("hash = (hash * 397) ^ (int)x");
        match expr.kind {
            ExprKind::Assign { op, value, .. } => {
                assert_eq!(op, AssignOp::Assign);
                match value.kind {
                    ExprKind::Binary { op, left, right } => {
                        assert_eq!(op, BinaryOp::BitXor);
                        assert!(matches!(left.kind, ExprKind::Paren(_)));
                        assert!(matches!(right.kind, ExprKind::Cast { .. }));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parenthesized_is_not_a_cast() {
        assert!(matches!(parse("(a) - b").kind, ExprKind::Binary { .. }));
        assert!(matches!(parse("(a)").kind, ExprKind::Paren(_)));
        assert!(matches!(parse("(long)x").kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_is_with_binding_inside_conditional() {
        let expr = parse("shape is Circle c ? 1 : 2");
        match expr.kind {
            ExprKind::Conditional { cond, .. } => match cond.kind {
                ExprKind::Is { ty, binding, .. } => {
                    assert_eq!(ty.name, "Circle");
                    assert_eq!(binding.as_deref(), Some("c"));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_with_named_arguments() {
        let expr = parse("log.write(\"hi\", logger: logger)");
        match expr.kind {
            ExprKind::Call { callee, args } => {
                assert!(matches!(callee.kind, ExprKind::Member { ref name, .. } if name == "write"));
                assert_eq!(args[0].name, None);
                assert_eq!(args[1].name.as_deref(), Some("logger"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse("10L").kind,
            ExprKind::Literal(Literal::Int { value: 10, long: true })
        );
        assert_eq!(parse("1.5f").kind, ExprKind::Literal(Literal::Float("1.5f".into())));
        assert_eq!(
            parse(r#""a\"b\n""#).kind,
            ExprKind::Literal(Literal::String("a\"b\n".into()))
        );
        assert!(matches!(parse("default(int)").kind, ExprKind::Default(Some(_))));
        assert!(matches!(parse("new Point(1, 2)").kind, ExprKind::New { .. }));
    }

    #[test]
    fn test_compound_assignment_is_not_binary() {
        assert!(matches!(
            parse("x ??= y").kind,
            ExprKind::Assign { op: AssignOp::Coalesce, .. }
        ));
        assert!(matches!(parse("x += 1").kind, ExprKind::Assign { op: AssignOp::Add, .. }));
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(parse_expression("\"abc").is_err());
    }
}
