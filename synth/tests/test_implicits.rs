use synth::{Program, Session, SessionConfig, SessionResult};

fn run(text: &str) -> (Program, SessionResult) {
    synth::logging::init_test();
    let mut program = Program::new();
    program.add_source("app.lm", text).expect("source should parse");
    let result = Session::new(SessionConfig::default()).run(&mut program);
    for diagnostic in result.diagnostics.iter() {
        println!("  - {:?} {:?}: {}", diagnostic.severity, diagnostic.code, diagnostic.message);
    }
    (program, result)
}

fn expanded(text: &str) -> String {
    let (program, result) = run(text);
    assert!(result.committed, "session should commit");
    let text = program
        .expanded()
        .and_then(|output| output.text("app.lm"))
        .expect("expanded unit")
        .to_string();
    println!("{}", text);
    text
}

#[test]
fn test_pass_through_forwards_logger() {
    let text = expanded(
        r#"
namespace App {
    class Logger {
        public void write(string message) { }
    }
    class Service {
        void work(@implicit Logger logger) {
            logger.write("working");
        }

        @pass_through
        void step() {
            work();
        }

        void run(@implicit Logger logger) {
            step();
        }
    }
}
"#,
    );
    assert!(text.contains("void step(@implicit Logger logger) {"));
    assert!(text.contains("            work(logger: logger);\n"));
    assert!(text.contains("            step(logger: logger);\n"));
}

#[test]
fn test_pass_through_chains_resolve_transitively() {
    let text = expanded(
        r#"
class Logger { }
class Clock { }
class Jobs {
    void tick(@implicit Logger logger, @implicit Clock clock) { }

    @pass_through
    void inner() {
        tick();
    }

    @pass_through
    void outer(@implicit Clock clock) {
        inner();
    }

    void main(@implicit Logger log, @implicit Clock now) {
        outer();
    }
}
"#,
    );
    assert!(text.contains("void inner(@implicit Logger logger, @implicit Clock clock) {"));
    assert!(text.contains("void outer(@implicit Clock clock, @implicit Logger logger) {"));
    assert!(text.contains("inner(logger: logger, clock: clock);"));
    assert!(text.contains("outer(clock: now, logger: log);"));
}

#[test]
fn test_cycle_is_reported_once() {
    let (program, result) = run(
        r#"
class Logger { }
class Cycle {
    void work(@implicit Logger logger) { }

    @pass_through
    void a() {
        b();
    }

    @pass_through
    void b() {
        c();
    }

    @pass_through
    void c() {
        a();
        work();
    }
}
"#,
    );
    assert!(!result.committed);
    let cycles: Vec<_> = result.diagnostics.with_code("E2004").collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(
        cycles[0].message,
        "cyclic pass-through: Cycle.a -> Cycle.b -> Cycle.c -> Cycle.a"
    );
    assert_eq!(result.diagnostics.error_count(), 1);
    assert!(program.expanded().is_none());
}

#[test]
fn test_fields_and_properties_are_candidates() {
    let text = expanded(
        r#"
class Logger { }
class Clock { }
class Base {
    @implicit protected Logger logger;
}
class Service : Base {
    @implicit Clock Time { get; }

    void work(@implicit Logger logger, @implicit Clock clock) { }

    void run() {
        work();
    }
}
"#,
    );
    assert!(text.contains("work(logger: logger, clock: Time);"));
}

#[test]
fn test_explicit_arguments_satisfy_slots() {
    let text = expanded(
        r#"
class Logger { }
class Service {
    @implicit Logger shared;

    void work(int n, @implicit Logger logger) { }

    void run(Logger other) {
        work(1, other);
        work(2, logger: other);
        work(3);
    }
}
"#,
    );
    assert!(text.contains("work(1, other);"));
    assert!(text.contains("work(2, logger: other);"));
    assert!(text.contains("work(3, logger: shared);"));
}

#[test]
fn test_ambiguous_candidates_are_listed() {
    let (_, result) = run(
        r#"
class Logger { }
class Service {
    @implicit Logger primary;
    @implicit Logger secondary;

    void work(@implicit Logger logger) { }

    void run() {
        work();
    }
}
"#,
    );
    assert!(!result.committed);
    let ambiguous: Vec<_> = result.diagnostics.with_code("E2002").collect();
    assert_eq!(ambiguous.len(), 1);
    assert!(ambiguous[0].message.contains("Service.primary, Service.secondary"));
}

#[test]
fn test_missing_implicit() {
    let (_, result) = run(
        r#"
class Logger { }
class Service {
    void work(@implicit Logger logger) { }

    static void run() {
        new Service().work();
    }
}
"#,
    );
    assert!(!result.committed);
    let missing: Vec<_> = result.diagnostics.with_code("E2003").collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].message.contains("'Logger'"));
    assert!(missing[0].message.contains("'Service.work'"));
}

#[test]
fn test_static_context_ignores_instance_fields() {
    let (_, result) = run(
        r#"
class Logger { }
class Service {
    @implicit Logger logger;

    static void work(@implicit Logger logger) { }

    static void run() {
        work();
    }
}
"#,
    );
    assert_eq!(result.diagnostics.with_code("E2003").count(), 1);
}

#[test]
fn test_hidden_implicit_names_the_shadow() {
    let (_, result) = run(
        r#"
class Logger { }
class Service {
    @implicit Logger logger;

    void work(@implicit Logger logger) { }

    void run() {
        Logger logger = null;
        work();
        work();
    }
}
"#,
    );
    assert!(!result.committed);
    let hidden: Vec<_> = result.diagnostics.with_code("E2001").collect();
    assert_eq!(hidden.len(), 1);
    assert!(hidden[0].message.contains("local or parameter 'logger'"));
    assert_eq!(result.diagnostics.with_code("E2003").count(), 0);
}

#[test]
fn test_constructor_calls_receive_implicits() {
    let text = expanded(
        r#"
class Logger { }
class Worker {
    public Worker(string name, @implicit Logger logger) { }
}
class Factory {
    Worker make(@implicit Logger logger) => new Worker("w");
}
"#,
    );
    assert!(text.contains("new Worker(\"w\", logger: logger);"));
}

#[test]
fn test_hidden_implicit_is_reported_even_with_another_match() {
    let (program, result) = run(
        r#"
class Logger { }
class Base {
    @implicit protected Logger logger;
}
class Derived : Base {
    Logger logger;

    void work(@implicit Logger log) { }

    void run(@implicit Logger other) {
        work();
    }
}
"#,
    );
    assert!(!result.committed);
    let hidden: Vec<_> = result.diagnostics.with_code("E2001").collect();
    assert_eq!(hidden.len(), 1);
    assert!(hidden[0].message.contains("field 'Derived.logger'"));
    assert_eq!(result.diagnostics.with_code("E2002").count(), 0);
    assert!(program.expanded().is_none());
}
