//! Loom parser with full span tracking
//!
//! Declarations, types and the lexical helpers shared by the statement and
//! expression parsers. Every parser takes the full input alongside the
//! remaining input so it can compute byte offsets for spans.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{alpha1, alphanumeric1, char, multispace1},
    combinator::{not, opt, peek, recognize, value, verify},
    error::{ErrorKind, context},
    multi::{many0, separated_list1},
    sequence::pair,
};

use crate::ast::*;
use crate::custom_error::ContextualError;
use crate::parser_expr::{arguments, expression};
use crate::parser_stmt::block;
use diagnostics::syntax::SyntaxDiagnostics;
use diagnostics::{Diagnostics, FileId, SourceFile, SourceSpan};

/// Parser result type with contextual errors to capture context strings
pub type PResult<'a, T> = IResult<&'a str, T, ContextualError<&'a str>>;

// =============================================================================
// Entry Points
// =============================================================================

/// Parse a complete Loom unit. Spans in the returned diagnostics use file id 0;
/// use [`parse_unit_in`] when the unit is registered in a `SourceMap`.
pub fn parse_unit(path: &str, text: &str) -> Result<Unit, Diagnostics> {
    parse_unit_in(FileId::new(0), path, text)
}

/// Parse a complete Loom unit, reporting diagnostics against `file_id`.
///
/// On success every node carries a fresh `NodeId`.
pub fn parse_unit_in(file_id: FileId, path: &str, text: &str) -> Result<Unit, Diagnostics> {
    let full = text;
    let mut input = text;
    let mut items = Vec::new();

    loop {
        let (rest, _) = ws(input).map_err(|e| to_diagnostics(file_id, path, full, e))?;
        input = rest;
        if input.is_empty() {
            break;
        }

        match item(full, input) {
            Ok((rest, parsed)) => {
                items.push(parsed);
                input = rest;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) if e.remaining() == input.len() => {
                // Nothing of a declaration was recognized
                let start = position(full, input);
                let found = next_token(input);
                let span = make_source_span(file_id, path, full, start, start + found.len());
                return Err(Diagnostics::from(vec![SyntaxDiagnostics::trailing_input(
                    span, found,
                )]));
            }
            Err(e) => return Err(to_diagnostics(file_id, path, full, e)),
        }
    }

    let mut unit = Unit {
        path: path.to_string(),
        items,
        span: Span::new(0, full.len()),
    };
    number_nodes(&mut unit);
    Ok(unit)
}

/// Parse a single expression; the whole input must be consumed.
pub fn parse_expression(text: &str) -> Result<Expr, Diagnostics> {
    let full = text;
    complete(full, expression(full, text))
}

/// Parse a sequence of statements; the whole input must be consumed.
pub fn parse_statements(text: &str) -> Result<Vec<Stmt>, Diagnostics> {
    let full = text;
    let mut input = text;
    let mut stmts = Vec::new();
    loop {
        let (rest, _) = ws(input).map_err(|e| to_diagnostics(FileId::new(0), "", full, e))?;
        input = rest;
        if input.is_empty() {
            return Ok(stmts);
        }
        match crate::parser_stmt::statement(full, input) {
            Ok((rest, stmt)) => {
                stmts.push(stmt);
                input = rest;
            }
            Err(e) => return Err(to_diagnostics(FileId::new(0), "", full, e)),
        }
    }
}

/// Parse a type reference; the whole input must be consumed.
pub fn parse_type(text: &str) -> Result<TypeRef, Diagnostics> {
    let full = text;
    complete(full, type_ref(full, text))
}

/// Parse a list of members as they would appear inside `type_name`'s body.
pub fn parse_members(type_name: &str, text: &str) -> Result<Vec<Member>, Diagnostics> {
    let full = text;
    let mut input = text;
    let mut members = Vec::new();
    loop {
        let (rest, _) = ws(input).map_err(|e| to_diagnostics(FileId::new(0), "", full, e))?;
        input = rest;
        if input.is_empty() {
            return Ok(members);
        }
        match member(full, input, type_name) {
            Ok((rest, parsed)) => {
                members.push(parsed);
                input = rest;
            }
            Err(e) => return Err(to_diagnostics(FileId::new(0), "", full, e)),
        }
    }
}

fn complete<'a, T>(full: &'a str, result: PResult<'a, T>) -> Result<T, Diagnostics> {
    let file_id = FileId::new(0);
    let (rest, parsed) = result.map_err(|e| to_diagnostics(file_id, "", full, e))?;
    let (rest, _) = ws(rest).map_err(|e| to_diagnostics(file_id, "", full, e))?;
    if rest.is_empty() {
        return Ok(parsed);
    }
    let start = position(full, rest);
    let found = next_token(rest);
    let span = make_source_span(file_id, "", full, start, start + found.len());
    Err(Diagnostics::from(vec![SyntaxDiagnostics::parse_failure(
        span,
        Some("expected end of input"),
        found,
    )]))
}

fn to_diagnostics(
    file_id: FileId,
    path: &str,
    full: &str,
    error: nom::Err<ContextualError<&str>>,
) -> Diagnostics {
    let error = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => e,
        nom::Err::Incomplete(_) => ContextualError::new("", ErrorKind::Eof),
    };
    let offset = error.byte_offset(full);
    let found = next_token(&full[offset..]);
    let span = make_source_span(file_id, path, full, offset, offset + found.len());
    Diagnostics::from(vec![SyntaxDiagnostics::parse_failure(
        span,
        error.innermost_context(),
        found,
    )])
}

fn make_source_span(file_id: FileId, path: &str, full: &str, start: usize, end: usize) -> SourceSpan {
    let file = SourceFile::new(path.to_string(), full.to_string());
    SourceSpan::new(
        file.offset_to_position(start),
        file.offset_to_position(end),
        file_id,
    )
}

/// The word or symbol at the start of `input`, for error messages
fn next_token(input: &str) -> &str {
    let input = input.trim_start();
    let Some(first) = input.chars().next() else {
        return "";
    };
    let len = if first.is_alphanumeric() || first == '_' {
        input
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(input.len())
    } else {
        first.len_utf8()
    };
    &input[..len]
}

// =============================================================================
// Whitespace and Comments
// =============================================================================

/// Skip whitespace and comments
pub fn ws(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), line_comment),
            value((), block_comment),
        ))),
    )
    .parse(input)
}

/// Line comment: // comment
fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize((tag("//"), take_while(|c| c != '\n'), opt(char('\n')))).parse(input)
}

/// Block comment: /* comment */
fn block_comment(input: &str) -> PResult<'_, &str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

/// Get current byte offset of `current` inside `full`
pub fn position(full: &str, current: &str) -> usize {
    full.len() - current.len()
}

/// Create span from start position to current position
pub fn make_span(full: &str, start_pos: usize, current: &str) -> Span {
    Span::new(start_pos, position(full, current))
}

// =============================================================================
// Basic Elements
// =============================================================================

/// Reserved keywords
pub fn is_keyword(s: &str) -> bool {
    matches!(
        s,
        "namespace"
            | "class"
            | "struct"
            | "interface"
            | "enum"
            | "public"
            | "private"
            | "protected"
            | "internal"
            | "static"
            | "abstract"
            | "sealed"
            | "partial"
            | "readonly"
            | "override"
            | "virtual"
            | "const"
            | "return"
            | "if"
            | "else"
            | "while"
            | "foreach"
            | "in"
            | "throw"
            | "break"
            | "continue"
            | "goto"
            | "new"
            | "default"
            | "this"
            | "true"
            | "false"
            | "null"
            | "is"
    )
}

/// Parse a keyword (ensures it's not part of a larger identifier)
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        let (input, word) = recognize(pair(
            tag(kw),
            peek(not(alt((alphanumeric1, tag("_"))))),
        ))
        .parse(input)?;
        Ok((input, word))
    }
}

/// Parse an identifier
pub fn identifier(input: &str) -> PResult<'_, String> {
    let (input, _) = ws(input)?;
    let (input, id) = verify(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |s: &str| !is_keyword(s),
    )
    .parse(input)?;
    Ok((input, id.to_string()))
}

/// Parse a symbol with optional leading whitespace
pub fn symbol<'a>(sym: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        tag(sym)(input)
    }
}

/// Whether the next token (after whitespace) starts with `sym`
pub fn at_symbol(input: &str, sym: &str) -> bool {
    match ws(input) {
        Ok((rest, _)) => rest.starts_with(sym),
        Err(_) => false,
    }
}

/// Whether the next token is the keyword `kw`
pub fn at_keyword(input: &str, kw: &'static str) -> bool {
    keyword(kw)(input).is_ok()
}

/// Dotted name: `A.B.C`
pub fn dotted_name(input: &str) -> PResult<'_, String> {
    let (input, parts) = separated_list1(symbol("."), identifier).parse(input)?;
    Ok((input, parts.join(".")))
}

/// Error at the current position, used when a hand-written branch fails
pub fn fail<T>(input: &str) -> PResult<'_, T> {
    Err(nom::Err::Error(ContextualError::new(input, ErrorKind::Verify)))
}

// =============================================================================
// Types
// =============================================================================

/// Type reference: `Name`, `A.B<T, U>?[]`
pub fn type_ref<'a>(full: &'a str, input: &'a str) -> PResult<'a, TypeRef> {
    type_ref_with(full, input, true)
}

/// Type reference that never reads a trailing `?`, for `is` tests where the
/// question mark belongs to a conditional expression
pub fn type_ref_no_nullable<'a>(full: &'a str, input: &'a str) -> PResult<'a, TypeRef> {
    type_ref_with(full, input, false)
}

fn type_ref_with<'a>(full: &'a str, input: &'a str, allow_nullable: bool) -> PResult<'a, TypeRef> {
    let (mut input, name) = dotted_name(input)?;
    let mut ty = TypeRef::simple(name);

    if at_symbol(input, "<") {
        let (rest, _) = symbol("<")(input)?;
        let (rest, args) =
            separated_list1(symbol(","), |i| type_ref(full, i)).parse(rest)?;
        let (rest, _) = symbol(">")(rest)?;
        ty.args = args;
        input = rest;
    }

    if allow_nullable && at_symbol(input, "?") && !at_symbol(input, "??") && !at_symbol(input, "?.") {
        let (rest, _) = symbol("?")(input)?;
        ty.nullable = true;
        input = rest;
    }

    while let Ok((rest, _)) = pair(symbol("["), symbol("]")).parse(input) {
        ty.array_rank += 1;
        input = rest;
    }

    Ok((input, ty))
}

/// Generic parameter list: `<T, U : class>`
fn type_params<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<TypeParam>> {
    if !at_symbol(input, "<") {
        return Ok((input, Vec::new()));
    }
    let (input, _) = symbol("<")(input)?;
    let (input, params) = separated_list1(symbol(","), |i| type_param(full, i)).parse(input)?;
    let (input, _) = context("expected '>' after type parameters", symbol(">")).parse(input)?;
    Ok((input, params))
}

fn type_param<'a>(full: &'a str, input: &'a str) -> PResult<'a, TypeParam> {
    let (input, name) = context("expected type parameter name", identifier).parse(input)?;
    if !at_symbol(input, ":") {
        return Ok((input, TypeParam { name, constraint: None }));
    }
    let (input, _) = symbol(":")(input)?;
    let (input, constraint) = alt((
        value(TypeConstraint::Class, keyword("class")),
        value(TypeConstraint::Struct, keyword("struct")),
        |i| type_ref(full, i).map(|(rest, ty)| (rest, TypeConstraint::Type(ty))),
    ))
    .parse(input)?;
    Ok((
        input,
        TypeParam {
            name,
            constraint: Some(constraint),
        },
    ))
}

// =============================================================================
// Annotations and Modifiers
// =============================================================================

/// Annotation list: `@record @pattern("...")`
pub fn annotations<'a>(full: &'a str, mut input: &'a str) -> PResult<'a, Vec<Annotation>> {
    let mut result = Vec::new();
    while at_symbol(input, "@") {
        let (rest, annotation) = annotation(full, input)?;
        result.push(annotation);
        input = rest;
    }
    Ok((input, result))
}

fn annotation<'a>(full: &'a str, input: &'a str) -> PResult<'a, Annotation> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = char('@')(input)?;
    let (input, name) = context("expected annotation name", identifier).parse(input)?;
    let (input, args) = if at_symbol(input, "(") {
        arguments(full, input)?
    } else {
        (input, Vec::new())
    };
    Ok((
        input,
        Annotation {
            name,
            args,
            span: make_span(full, start, input),
        },
    ))
}

/// Modifier list in any order
pub fn modifiers(mut input: &str) -> PResult<'_, Vec<Modifier>> {
    let mut result = Vec::new();
    'outer: loop {
        for modifier in Modifier::ALL {
            if let Ok((rest, _)) = keyword(modifier.keyword())(input) {
                result.push(modifier);
                input = rest;
                continue 'outer;
            }
        }
        return Ok((input, result));
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Namespace or type declaration
fn item<'a>(full: &'a str, input: &'a str) -> PResult<'a, Item> {
    if at_keyword(input, "namespace") {
        return namespace_decl(full, input).map(|(rest, ns)| (rest, Item::Namespace(ns)));
    }
    let (rest, decl) = type_decl(full, input)?;
    Ok((rest, Item::Type(decl)))
}

/// `namespace A.B { ... }`
fn namespace_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, NamespaceDecl> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("namespace")(input)?;
    let (input, path) = context("expected namespace name", dotted_name).parse(input)?;
    let (mut input, _) = context("expected '{' after namespace name", symbol("{")).parse(input)?;

    let mut items = Vec::new();
    while !at_symbol(input, "}") {
        let (rest, parsed) = item(full, input)?;
        items.push(parsed);
        input = rest;
    }
    let (input, _) = symbol("}")(input)?;

    Ok((
        input,
        NamespaceDecl {
            path: path.split('.').map(str::to_string).collect(),
            items,
            span: make_span(full, start, input),
        },
    ))
}

/// Type declaration with its leading annotations and modifiers
pub fn type_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, TypeDecl> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, annotations) = annotations(full, input)?;
    let (input, modifiers) = modifiers(input)?;
    type_decl_rest(full, input, start, annotations, modifiers)
}

fn type_kind(input: &str) -> PResult<'_, TypeKind> {
    alt((
        value(TypeKind::Class, keyword("class")),
        value(TypeKind::Struct, keyword("struct")),
        value(TypeKind::Interface, keyword("interface")),
        value(TypeKind::Enum, keyword("enum")),
    ))
    .parse(input)
}

fn at_type_kind(input: &str) -> bool {
    type_kind(input).is_ok()
}

fn type_decl_rest<'a>(
    full: &'a str,
    input: &'a str,
    start: usize,
    annotations: Vec<Annotation>,
    modifiers: Vec<Modifier>,
) -> PResult<'a, TypeDecl> {
    let (input, kind) = context("expected type declaration", type_kind).parse(input)?;
    let (input, name) = context("expected type name", identifier).parse(input)?;
    let (input, type_params) = type_params(full, input)?;

    let (input, bases) = if at_symbol(input, ":") {
        let (input, _) = symbol(":")(input)?;
        separated_list1(symbol(","), |i| type_ref(full, i)).parse(input)?
    } else {
        (input, Vec::new())
    };

    let (mut input, _) = context("expected '{' to open type body", symbol("{")).parse(input)?;

    let mut members = Vec::new();
    let mut enum_cases = Vec::new();
    if kind == TypeKind::Enum {
        while !at_symbol(input, "}") {
            let (rest, case) = enum_case(full, input)?;
            enum_cases.push(case);
            input = rest;
            if at_symbol(input, ",") {
                input = symbol(",")(input)?.0;
            } else {
                break;
            }
        }
    } else {
        while !at_symbol(input, "}") {
            let (rest, parsed) = member(full, input, &name)?;
            members.push(parsed);
            input = rest;
        }
    }
    let (input, _) = context("expected '}' to close type body", symbol("}")).parse(input)?;

    Ok((
        input,
        TypeDecl {
            id: NodeId::DUMMY,
            annotations,
            modifiers,
            kind,
            name,
            type_params,
            bases,
            members,
            enum_cases,
            span: make_span(full, start, input),
        },
    ))
}

fn enum_case<'a>(full: &'a str, input: &'a str) -> PResult<'a, EnumCase> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, name) = context("expected enum case name", identifier).parse(input)?;
    let (input, value) = if at_symbol(input, "=") {
        let (input, _) = symbol("=")(input)?;
        let (input, value) = expression(full, input)?;
        (input, Some(value))
    } else {
        (input, None)
    };
    Ok((
        input,
        EnumCase {
            name,
            value,
            span: make_span(full, start, input),
        },
    ))
}

/// Member of the type named `type_name`
pub fn member<'a>(full: &'a str, input: &'a str, type_name: &str) -> PResult<'a, Member> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, annotations) = annotations(full, input)?;
    let (input, modifiers) = modifiers(input)?;

    if at_type_kind(input) {
        let (input, decl) = type_decl_rest(full, input, start, annotations, modifiers)?;
        return Ok((input, Member::Type(decl)));
    }

    if let Ok((after, name)) = identifier(input) {
        if name == type_name && at_symbol(after, "(") {
            let (input, params) = param_list(full, after)?;
            let (input, body) = context("expected constructor body", |i| block(full, i)).parse(input)?;
            return Ok((
                input,
                Member::Constructor(ConstructorDecl {
                    id: NodeId::DUMMY,
                    annotations,
                    modifiers,
                    name,
                    params,
                    body,
                    span: make_span(full, start, input),
                }),
            ));
        }
    }

    let (input, ty) = context("expected member type", |i| type_ref(full, i)).parse(input)?;
    let (input, name) = context("expected member name", identifier).parse(input)?;

    if at_symbol(input, "(") || at_symbol(input, "<") {
        let (input, method) = method_rest(full, input, start, annotations, modifiers, ty, name)?;
        return Ok((input, Member::Method(method)));
    }

    if at_symbol(input, "{") {
        let (input, (getter, setter)) = accessors(input)?;
        let (input, init) = if at_symbol(input, "=") {
            let (input, _) = symbol("=")(input)?;
            let (input, init) = expression(full, input)?;
            let (input, _) = context("expected ';' after property initializer", symbol(";")).parse(input)?;
            (input, Some(init))
        } else {
            (input, None)
        };
        return Ok((
            input,
            Member::Property(PropertyDecl {
                id: NodeId::DUMMY,
                annotations,
                modifiers,
                ty,
                name,
                getter,
                setter,
                init,
                span: make_span(full, start, input),
            }),
        ));
    }

    let (input, init) = if at_symbol(input, "=") {
        let (input, _) = symbol("=")(input)?;
        let (input, init) = expression(full, input)?;
        (input, Some(init))
    } else {
        (input, None)
    };
    let (input, _) = context("expected ';' after field", symbol(";")).parse(input)?;
    Ok((
        input,
        Member::Field(FieldDecl {
            id: NodeId::DUMMY,
            annotations,
            modifiers,
            ty,
            name,
            init,
            span: make_span(full, start, input),
        }),
    ))
}

/// `{ get; set; }` in either order
fn accessors(input: &str) -> PResult<'_, (bool, bool)> {
    let (mut input, _) = symbol("{")(input)?;
    let mut getter = false;
    let mut setter = false;
    loop {
        if let Ok((rest, _)) = pair(keyword("get"), symbol(";")).parse(input) {
            getter = true;
            input = rest;
        } else if let Ok((rest, _)) = pair(keyword("set"), symbol(";")).parse(input) {
            setter = true;
            input = rest;
        } else {
            break;
        }
    }
    let (input, _) = context("expected 'get;', 'set;' or '}'", symbol("}")).parse(input)?;
    Ok((input, (getter, setter)))
}

/// Method after its return type and name: type parameters, parameters, body
pub fn method_rest<'a>(
    full: &'a str,
    input: &'a str,
    start: usize,
    annotations: Vec<Annotation>,
    modifiers: Vec<Modifier>,
    return_type: TypeRef,
    name: String,
) -> PResult<'a, MethodDecl> {
    let (input, type_params) = type_params(full, input)?;
    let (input, params) = param_list(full, input)?;

    let (input, body) = if at_symbol(input, "{") {
        let (input, body) = block(full, input)?;
        (input, Some(Body::Block(body)))
    } else if at_symbol(input, "=>") {
        let (input, _) = symbol("=>")(input)?;
        let (input, body) = expression(full, input)?;
        let (input, _) = context("expected ';' after expression body", symbol(";")).parse(input)?;
        (input, Some(Body::Expr(body)))
    } else {
        let (input, _) = context("expected method body or ';'", symbol(";")).parse(input)?;
        (input, None)
    };

    Ok((
        input,
        MethodDecl {
            id: NodeId::DUMMY,
            annotations,
            modifiers,
            return_type,
            name,
            type_params,
            params,
            body,
            span: make_span(full, start, input),
        },
    ))
}

/// `(int x, @implicit Logger logger = default)`
fn param_list<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<Param>> {
    let (mut input, _) = context("expected '('", symbol("(")).parse(input)?;
    let mut params = Vec::new();
    if !at_symbol(input, ")") {
        loop {
            let (rest, parsed) = param(full, input)?;
            params.push(parsed);
            input = rest;
            if at_symbol(input, ",") {
                input = symbol(",")(input)?.0;
            } else {
                break;
            }
        }
    }
    let (input, _) = context("expected ')' after parameters", symbol(")")).parse(input)?;
    Ok((input, params))
}

fn param<'a>(full: &'a str, input: &'a str) -> PResult<'a, Param> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, annotations) = annotations(full, input)?;
    let (input, ty) = context("expected parameter type", |i| type_ref(full, i)).parse(input)?;
    let (input, name) = context("expected parameter name", identifier).parse(input)?;
    let (input, default) = if at_symbol(input, "=") {
        let (input, _) = symbol("=")(input)?;
        let (input, default) = expression(full, input)?;
        (input, Some(default))
    } else {
        (input, None)
    };
    Ok((
        input,
        Param {
            annotations,
            ty,
            name,
            default,
            span: make_span(full, start, input),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Unit {
        parse_unit("test.lm", text).expect("unit should parse")
    }

    fn first_type(unit: &Unit) -> &TypeDecl {
        match &unit.items[0] {
            Item::Type(decl) => decl,
            Item::Namespace(ns) => match &ns.items[0] {
                Item::Type(decl) => decl,
                _ => panic!("expected type"),
            },
        }
    }

    #[test]
    fn test_record_declaration() {
        let unit = parse(
            r#"
            namespace Geo {
                @record
                public partial class Point {
                    public int x;
                    public int y;
                }
            }
            "#,
        );
        let decl = first_type(&unit);
        assert_eq!(decl.name, "Point");
        assert_eq!(decl.kind, TypeKind::Class);
        assert!(decl.is_partial());
        assert_eq!(decl.annotations[0].name, "record");
        assert_eq!(decl.members.len(), 2);
        assert_eq!(decl.members[1].name(), "y");
    }

    #[test]
    fn test_generic_type_and_members() {
        let unit = parse(
            r#"
            partial class Box<T : class> : Base, IThing {
                T Value { get; set; } = default;
                Box(T value) { this.Value = value; }
                static int Count<U>(List<U> items) => items.count;
                abstract void Run();
            }
            "#,
        );
        let decl = first_type(&unit);
        assert_eq!(decl.type_params[0].constraint, Some(TypeConstraint::Class));
        assert_eq!(decl.bases.len(), 2);
        assert!(matches!(decl.members[0], Member::Property(ref p) if p.getter && p.setter));
        assert!(matches!(decl.members[1], Member::Constructor(_)));
        match &decl.members[2] {
            Member::Method(m) => {
                assert!(m.is_static());
                assert_eq!(m.type_params[0].name, "U");
                assert_eq!(m.params[0].ty.to_string(), "List<U>");
                assert!(matches!(m.body, Some(Body::Expr(_))));
            }
            other => panic!("expected method, got {:?}", other),
        }
        assert!(matches!(decl.members[3], Member::Method(ref m) if m.body.is_none()));
    }

    #[test]
    fn test_enum_with_underlying_type() {
        let unit = parse("enum Color : long { Red, Green = 2, Blue, }");
        let decl = first_type(&unit);
        assert_eq!(decl.kind, TypeKind::Enum);
        assert_eq!(decl.bases[0].name, "long");
        assert_eq!(decl.enum_cases.len(), 3);
        assert!(decl.enum_cases[1].value.is_some());
    }

    #[test]
    fn test_type_refs() {
        assert_eq!(parse_type("int").unwrap().to_string(), "int");
        assert_eq!(
            parse_type("Dictionary<string, List<int>>").unwrap().to_string(),
            "Dictionary<string, List<int>>"
        );
        let ty = parse_type("int?[]").unwrap();
        assert!(ty.nullable);
        assert_eq!(ty.array_rank, 1);
    }

    #[test]
    fn test_node_ids_are_unique() {
        let unit = parse("class A { void f() { g(1 + 2); } }");
        let decl = first_type(&unit);
        assert!(!decl.id.is_dummy());
        assert!(!decl.members[0].id().is_dummy());
        assert_ne!(decl.id, decl.members[0].id());
    }

    #[test]
    fn test_parameter_annotations_and_defaults() {
        let unit = parse("class A { void log(string msg, @implicit Logger logger, int level = 3) {} }");
        let decl = first_type(&unit);
        match &decl.members[0] {
            Member::Method(m) => {
                assert!(m.params[1].has_annotation("implicit"));
                assert!(m.params[2].default.is_some());
            }
            _ => panic!("expected method"),
        }
    }

    #[test]
    fn test_parse_error_is_reported_with_code() {
        let err = parse_unit("bad.lm", "class A { int x }").unwrap_err();
        let diagnostic = err.iter().next().unwrap();
        assert!(diagnostic.has_code(diagnostics::syntax::PARSE_ERROR));
        assert_eq!(diagnostic.span.start.line, 1);
    }

    #[test]
    fn test_trailing_input_is_reported() {
        let err = parse_unit("bad.lm", "class A {} 42").unwrap_err();
        let diagnostic = err.iter().next().unwrap();
        assert!(diagnostic.has_code(diagnostics::syntax::TRAILING_INPUT));
    }

    #[test]
    fn test_comments_are_skipped() {
        let unit = parse("// leading\n/* block */ class A { /* inner */ int x; // trailing\n }");
        assert_eq!(first_type(&unit).members.len(), 1);
    }
}
