use synth::{Program, Session, SessionConfig};

const SHAPES: &str = r#"
namespace Geo {
    @matcher
    public partial interface Shape { }

    public class Circle : Shape {
        public double radius;
    }

    public class Square : Shape {
        public double side;
    }

    public class Triangle : Shape { }
}
"#;

fn expand(text: &str) -> (Program, synth::SessionResult) {
    synth::logging::init_test();
    let mut program = Program::new();
    program.add_source("shapes.lm", text).expect("source should parse");
    let result = Session::new(SessionConfig::default()).run(&mut program);
    for diagnostic in result.diagnostics.iter() {
        println!("  - {:?} {:?}: {}", diagnostic.severity, diagnostic.code, diagnostic.message);
    }
    (program, result)
}

fn method<'t>(text: &'t str, header: &str) -> &'t str {
    let start = text.find(header).unwrap_or_else(|| panic!("missing {}", header));
    let rest = &text[start..];
    // members are separated by a blank line
    let end = rest.find("\n\n").unwrap_or(rest.len());
    &rest[..end]
}

#[test]
fn test_match_has_branch_per_subtype() {
    let (program, result) = expand(SHAPES);
    assert!(result.committed);
    let text = program
        .expanded()
        .and_then(|o| o.text("generated/Geo.Shape.matcher.g.lm"))
        .expect("matcher artifact");
    println!("{}", text);

    let matcher = method(
        text,
        "public void match(Action<Circle> circle, Action<Square> square, Action<Triangle> triangle)",
    );
    assert_eq!(matcher.matches(" is ").count(), 3);
    assert_eq!(matcher.matches("return;").count(), 3);
    assert_eq!(matcher.matches("throw new InvalidOperationException").count(), 1);

    let circle = matcher.find("this is Circle circleCase").unwrap();
    let square = matcher.find("this is Square squareCase").unwrap();
    let triangle = matcher.find("this is Triangle triangleCase").unwrap();
    assert!(circle < square && square < triangle);
}

#[test]
fn test_map_returns_from_every_branch() {
    let (program, _) = expand(SHAPES);
    let text = program
        .expanded()
        .and_then(|o| o.text("generated/Geo.Shape.matcher.g.lm"))
        .unwrap();
    let map = method(text, "public TResult map<TResult>(");
    assert!(map.contains("Func<Circle, TResult> circle"));
    assert_eq!(map.matches("return ").count(), 3);
    assert!(map.contains("return triangle(triangleCase);"));
    assert_eq!(map.matches("throw ").count(), 1);
}

#[test]
fn test_concrete_base_class_comes_last() {
    let (program, result) = expand(
        r#"
@matcher
partial class Node { }
class Leaf : Node { }
class Branch : Node { }
"#,
    );
    assert!(result.committed);
    let text = program
        .expanded()
        .and_then(|o| o.text("generated/Node.matcher.g.lm"))
        .unwrap();
    assert!(text.contains(
        "public void match(Action<Leaf> leaf, Action<Branch> branch, Action<Node> node)"
    ));
}

#[test]
fn test_subtypes_in_other_units_are_not_branches() {
    let mut program = Program::new();
    program
        .add_source("base.lm", "@matcher\npartial interface Event { }\nclass Started : Event { }")
        .unwrap();
    program
        .add_source("other.lm", "class Stopped : Event { }")
        .unwrap();
    let result = Session::new(SessionConfig::default()).run(&mut program);
    assert!(result.committed);
    let text = program
        .expanded()
        .and_then(|o| o.text("generated/Event.matcher.g.lm"))
        .unwrap();
    assert!(text.contains("Action<Started> started"));
    assert!(!text.contains("Stopped"));
}

#[test]
fn test_empty_matcher_warns_and_commits() {
    let (program, result) = expand("@matcher\npartial interface Lonely { }");
    assert!(result.committed);
    assert_eq!(result.diagnostics.warnings().count(), 1);
    assert!(result.diagnostics.with_code("E6004").next().is_some());
    assert!(program.artifacts().artifacts_of("shapes.lm").is_empty());
}

#[test]
fn test_matcher_rejects_config_and_structs() {
    let (_, result) = expand(
        r#"
@matcher(exhaustive: true)
partial interface Configured { }
class Impl : Configured { }
@matcher
partial struct Value { }
"#,
    );
    assert!(!result.committed);
    assert_eq!(result.diagnostics.with_code("E6001").count(), 1);
    assert_eq!(result.diagnostics.with_code("E6002").count(), 1);
}
