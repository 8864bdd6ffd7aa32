//! Parsing and printing complete Loom units

extern crate parser;
use parser::{parse_unit, print_unit, Item, Member, StmtKind, Body};

#[test]
fn test_macro_declarations_parse() {
    let input = r#"
namespace Greeting {
    public static class Macros {
        @pattern("\"Hello, ${name}!\"")
        public static string greet(string name) => "";

        @statement_pattern("if (${cond}) { throw new Error(${message}); }")
        public static void require(bool cond, string message = "failed") {}

        @inline
        public static int twice(int x) { return x * 2; }
    }
}
"#;

    let unit = match parse_unit("macros.lm", input) {
        Ok(unit) => unit,
        Err(e) => panic!("Failed to parse macro declarations: {:?}", e),
    };

    let Item::Namespace(ns) = &unit.items[0] else {
        panic!("expected namespace");
    };
    let Item::Type(decl) = &ns.items[0] else {
        panic!("expected type");
    };
    assert_eq!(decl.members.len(), 3);
    assert_eq!(decl.members[0].annotations()[0].name, "pattern");
    match &decl.members[2] {
        Member::Method(m) => assert!(matches!(m.body, Some(Body::Block(_)))),
        other => panic!("expected method, got {:?}", other),
    }
}

#[test]
fn test_inline_expansion_shape_parses() {
    let input = r#"
class Caller {
    int run(int y) {
        int twice_inline_3_17(int x) {
            int __result;
            {
                __result = x * 2;
                goto twice_inline_3_17_exit;
            }
            twice_inline_3_17_exit: return __result;
        }
        return twice_inline_3_17(y);
    }
}
"#;

    let unit = parse_unit("caller.lm", input).expect("inline expansion shape should parse");
    let Item::Type(decl) = &unit.items[0] else {
        panic!("expected type");
    };
    let Member::Method(run) = &decl.members[0] else {
        panic!("expected method");
    };
    let Some(Body::Block(body)) = &run.body else {
        panic!("expected block body");
    };
    assert!(matches!(body.stmts[0].kind, StmtKind::LocalFunction(_)));
}

#[test]
fn test_printed_unit_reparses_identically() {
    let input = r#"
@matcher
public abstract partial class Shape {
}

public sealed class Circle : Shape {
    public double radius;
}

public partial class Use {
    string describe(Shape shape) {
        if (shape is Circle c && c.radius > 1.0) {
            return "big circle";
        }
        return shape == null ? "none" : (string)shape.name ?? "shape";
    }
}
"#;

    let unit = parse_unit("shapes.lm", input).expect("should parse");
    let printed = print_unit(&unit);
    let reparsed = parse_unit("shapes.lm", &printed).expect("printed unit should parse");
    assert_eq!(printed, print_unit(&reparsed));
    assert_eq!(unit.items.len(), reparsed.items.len());
}

#[test]
fn test_error_points_at_line() {
    let input = "class A {\n    void f() {\n        int x = ;\n    }\n}\n";
    let err = parse_unit("broken.lm", input).unwrap_err();
    let diagnostic = err.iter().next().expect("one diagnostic");
    assert_eq!(diagnostic.span.start.line, 3);
}
