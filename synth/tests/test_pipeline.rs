use parser::{ExprKind, Literal, Unit};
use parser::visit::{self, VisitMut};
use synth::{
    ArtifactRegistry, ChangeSet, PassResult, Program, Session, SessionConfig, UnitPass,
};

const GEO: &str = r#"
namespace Geo {
    @record
    public partial struct Point {
        public int x;
        public int y;
    }

    @singleton
    public partial class Origin { }
}
"#;

const APP: &str = r#"
namespace App {
    class Logger { }
    static class Text {
        @pattern("\"[\" + ${value} + \"]\"")
        public static string bracket(string value);
    }
    class Reporter {
        void emit(string line, @implicit Logger logger) { }

        @pass_through
        void report(Geo.Point point) {
            emit(Text.bracket(point.toString()));
        }

        void run(@implicit Logger logger) {
            report(new Geo.Point(1, 2));
        }
    }
}
"#;

fn program(sources: &[(&str, &str)]) -> Program {
    let mut program = Program::new();
    for (path, text) in sources {
        program.add_source(path, text).expect("source should parse");
    }
    program
}

fn printed(program: &Program) -> Vec<(String, String)> {
    program
        .expanded()
        .expect("committed output")
        .iter()
        .map(|unit| (unit.path.clone(), unit.text.clone()))
        .collect()
}

fn sequential() -> SessionConfig {
    SessionConfig {
        parallel: false,
        ..SessionConfig::default()
    }
}

#[test]
fn test_whole_program_expands() {
    let mut program = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let result = Session::new(SessionConfig::default()).run(&mut program);
    for diagnostic in result.diagnostics.iter() {
        println!("  - {:?}: {}", diagnostic.code, diagnostic.message);
    }
    assert!(result.committed);
    assert_eq!(result.stats.units_scanned, 2);
    assert_eq!(result.stats.generated_units, 2);
    assert_eq!(result.stats.units, 4);
    assert_eq!(result.stats.macros, 1);

    let output = program.expanded().unwrap();
    let app = output.text("app.lm").unwrap();
    println!("{}", app);
    assert!(app.contains("void report(Geo.Point point, @implicit Logger logger) {"));
    assert!(app.contains("emit(\"[\" + point.toString() + \"]\", logger: logger);"));
    assert!(app.contains("report(new Geo.Point(1, 2), logger: logger);"));

    let paths: Vec<&str> = output.iter().map(|u| u.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "geo.lm",
            "app.lm",
            "generated/Geo.Point.record.g.lm",
            "generated/Geo.Origin.singleton.g.lm",
        ]
    );
    assert_eq!(output.generated().count(), 2);
}

#[test]
fn test_parallel_and_sequential_output_match() {
    let mut parallel = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let mut serial = program(&[("geo.lm", GEO), ("app.lm", APP)]);

    let a = Session::new(SessionConfig::default()).run(&mut parallel);
    let b = Session::new(sequential()).run(&mut serial);
    assert!(a.committed && b.committed);
    assert_eq!(printed(&parallel), printed(&serial));
    assert_eq!(parallel.artifacts(), serial.artifacts());
}

#[test]
fn test_dedicated_pool_gives_same_output() {
    let mut pooled = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let mut global = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let config = SessionConfig {
        threads: Some(2),
        ..SessionConfig::default()
    };
    assert!(Session::new(config).run(&mut pooled).committed);
    assert!(Session::new(SessionConfig::default()).run(&mut global).committed);
    assert_eq!(printed(&pooled), printed(&global));
}

#[test]
fn test_diagnostics_are_stable_across_runs() {
    let broken = r#"
class Logger { }
class A {
    void need(@implicit Logger logger) { }
    void one() { need(); }
    void two() { need(); }
}
@record
class NotPartial { public int x; }
"#;
    let messages = |config: SessionConfig| {
        let mut program = program(&[("broken.lm", broken)]);
        let result = Session::new(config).run(&mut program);
        result
            .diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
    };
    let first = messages(SessionConfig::default());
    assert_eq!(first.len(), 3);
    assert_eq!(first, messages(SessionConfig::default()));
    assert_eq!(first, messages(sequential()));
}

#[test]
fn test_second_session_only_rescans_changes() {
    let mut program = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let mut session = Session::new(SessionConfig::default());
    assert!(session.run(&mut program).committed);

    let again = session.run(&mut program);
    assert!(again.committed);
    assert_eq!(again.stats.units_scanned, 0);
    assert_eq!(again.stats.generated_units, 0);
    assert_eq!(again.stats.units, 4);
    assert_eq!(program.len(), 4);
}

#[test]
fn test_changes_replace_and_drop_artifacts() {
    let mut program = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let mut session = Session::new(SessionConfig::default());
    assert!(session.run(&mut program).committed);
    assert_eq!(program.artifacts().artifacts_of("geo.lm").len(), 2);

    // Origin loses its annotation
    let changed = GEO.replace("@singleton\n", "");
    let errors = program.apply_changes(ChangeSet::new().change("geo.lm", changed));
    assert!(errors.is_empty());
    assert!(program.is_stale("geo.lm"));
    assert!(program.get("generated/Geo.Origin.singleton.g.lm").is_none());

    let result = session.run(&mut program);
    assert!(result.committed);
    assert_eq!(result.stats.units_scanned, 1);
    assert_eq!(
        program.artifacts().artifacts_of("geo.lm"),
        ["generated/Geo.Point.record.g.lm".to_string()]
    );
    assert_eq!(
        program.artifacts().source_of("generated/Geo.Point.record.g.lm"),
        Some("geo.lm")
    );
    assert!(program.expanded().unwrap().get("generated/Geo.Origin.singleton.g.lm").is_none());

    let removed = program.apply_changes(ChangeSet::new().remove("geo.lm").remove("app.lm"));
    assert!(removed.is_empty());
    assert!(program.is_empty());
    assert!(program.artifacts().is_empty());
}

#[test]
fn test_added_unit_parse_error_is_reported() {
    let mut program = program(&[("geo.lm", GEO)]);
    let errors = program.apply_changes(ChangeSet::new().add("bad.lm", "class {"));
    assert!(errors.has_errors());
    assert!(program.get("bad.lm").is_none());
    let result = Session::new(SessionConfig::default()).run(&mut program);
    assert!(result.committed);
}

#[test]
fn test_registry_survives_json() {
    let mut program = program(&[("geo.lm", GEO)]);
    assert!(Session::new(SessionConfig::default()).run(&mut program).committed);

    let json = program.artifacts().to_json().unwrap();
    assert!(json.contains("generated/Geo.Point.record.g.lm"));
    let restored = ArtifactRegistry::from_json(&json).unwrap();
    assert_eq!(&restored, program.artifacts());
}

#[test]
fn test_failed_session_leaves_program_untouched() {
    let mut program = program(&[("geo.lm", GEO)]);
    let mut session = Session::new(SessionConfig::default());
    assert!(session.run(&mut program).committed);
    let before = printed(&program);

    program.apply_changes(ChangeSet::new().add(
        "bad.lm",
        "class Logger { }\nclass B { void need(@implicit Logger l) { } void go() { need(); } }",
    ));
    let result = session.run(&mut program);
    assert!(!result.committed);
    assert_eq!(result.stats.error_count, 1);
    assert_eq!(printed(&program), before);
    assert!(program.is_stale("bad.lm"));
}

/// Uppercases every string literal
struct ShoutPass;

struct Shout;

impl VisitMut for Shout {
    fn visit_expr(&mut self, expr: &mut parser::Expr) {
        if let ExprKind::Literal(Literal::String(value)) = &mut expr.kind {
            *value = value.to_uppercase();
        }
        visit::walk_expr_mut(self, expr);
    }
}

impl UnitPass for ShoutPass {
    fn name(&self) -> &'static str {
        "shout"
    }

    fn run_on_unit(&mut self, unit: &mut Unit) -> PassResult {
        Shout.visit_unit(unit);
        PassResult::changed()
    }
}

#[test]
fn test_unit_passes_run_after_rewrite() {
    let mut program = program(&[("geo.lm", GEO), ("app.lm", APP)]);
    let mut session = Session::new(SessionConfig::default());
    session.add_pass(ShoutPass);
    assert!(session.run(&mut program).committed);

    let output = program.expanded().unwrap();
    // the macro expansion is already in place when the pass runs
    assert!(output.text("app.lm").unwrap().contains("emit(\"[\" + point.toString() + \"]\""));
    assert!(output
        .text("generated/Geo.Point.record.g.lm")
        .unwrap()
        .contains("\"POINT(X: \" + x"));
}

#[test]
fn test_artifact_held_by_settled_source_is_not_overwritten() {
    let first = "namespace Geo {\n    @record\n    partial class Pair {\n        int x;\n    }\n}\n";
    let second = "namespace Geo {\n    @record\n    partial class Pair {\n        int y;\n    }\n}\n";
    let mut program = program(&[("a.lm", first)]);
    let mut session = Session::new(SessionConfig::default());
    assert!(session.run(&mut program).committed);
    let before = printed(&program);

    let errors = program.apply_changes(ChangeSet::new().add("b.lm", second));
    assert!(errors.is_empty());
    let result = session.run(&mut program);
    assert!(!result.committed);
    let duplicates: Vec<_> = result.diagnostics.with_code("E6003").collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].message.contains("generated/Geo.Pair.record.g.lm"));

    assert_eq!(
        program.artifacts().artifacts_of("a.lm"),
        ["generated/Geo.Pair.record.g.lm".to_string()]
    );
    assert!(program.artifacts().artifacts_of("b.lm").is_empty());
    assert_eq!(printed(&program), before);
    assert!(program.is_stale("b.lm"));
}
