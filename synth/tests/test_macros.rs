use synth::{Program, Session, SessionConfig, SessionResult};

fn run(path: &str, text: &str) -> (Program, SessionResult) {
    synth::logging::init_test();
    let mut program = Program::new();
    program.add_source(path, text).expect("source should parse");
    let result = Session::new(SessionConfig::default()).run(&mut program);
    for diagnostic in result.diagnostics.iter() {
        println!("  - {:?} {:?}: {}", diagnostic.severity, diagnostic.code, diagnostic.message);
    }
    (program, result)
}

fn expanded(path: &str, text: &str) -> String {
    let (program, result) = run(path, text);
    assert!(result.committed, "session should commit");
    let text = program
        .expanded()
        .and_then(|output| output.text(path))
        .expect("expanded unit")
        .to_string();
    println!("{}", text);
    text
}

const GREETINGS: &str = r#"
namespace App {
    class User {
        public string name;
    }
    static class Greetings {
        @pattern("\"Hello, ${name}!\"")
        public static string greet(string name);

        @pattern("${expr0} * ${expr0}")
        public static int square(int n);
    }
    class Front {
        string welcome(User user) {
            return Greetings.greet(user.name);
        }

        string twice(User user) {
            return Greetings.greet(Greetings.greet(user.name));
        }

        int area(int side) {
            return Greetings.square(side + 1);
        }
    }
}
"#;

#[test]
fn test_greet_pattern_expands_to_concatenation() {
    let text = expanded("front.lm", GREETINGS);
    assert!(text.contains("            return \"Hello, \" + user.name + \"!\";\n"));
}

#[test]
fn test_nested_invocations_expand_inner_first() {
    let text = expanded("front.lm", GREETINGS);
    assert!(text.contains("return \"Hello, \" + (\"Hello, \" + user.name + \"!\") + \"!\";"));
}

#[test]
fn test_positional_placeholders_parenthesize_arguments() {
    let text = expanded("front.lm", GREETINGS);
    assert!(text.contains("return (side + 1) * (side + 1);"));
}

#[test]
fn test_expansions_leave_no_placeholders() {
    let text = expanded("front.lm", GREETINGS);
    let body = &text[text.find("class Front").unwrap()..];
    assert!(!body.contains("${"));
    assert!(!body.contains("Greetings.greet("));
}

#[test]
fn test_statement_pattern_splices_statements() {
    let text = expanded(
        "account.lm",
        r#"
namespace Bank {
    class Error {
        public Error(string message) { }
    }
    static class Guard {
        @statement_pattern("if (!${cond}) { throw new Error(${message}); }")
        public static void require(bool cond, string message = "check failed");
    }
    class Account {
        int balance;

        void withdraw(int amount, bool allowed) {
            Guard.require(allowed);
            balance -= amount;
        }
    }
}
"#,
    );
    assert!(text.contains(
        "            if (!allowed) {\n                throw new Error(\"check failed\");\n            }\n            balance -= amount;\n"
    ));
}

#[test]
fn test_binding_pattern_uses_declared_variable() {
    let text = expanded(
        "pool.lm",
        r#"
namespace Buffers {
    class Buffer {
        public void clear() { }
    }
    static class Pool {
        @binding_pattern("${varType} ${varName} = Pool.take(); Pool.track(${varName}, ${size});")
        public static Buffer acquire(int size);

        public static Buffer take() => null;

        public static void track(Buffer buffer, int size) { }
    }
    class Worker {
        void run() {
            var buffer = Pool.acquire(64);
            buffer.clear();
        }
    }
}
"#,
    );
    assert!(text.contains(
        "            Buffer buffer = Pool.take();\n            Pool.track(buffer, 64);\n            buffer.clear();\n"
    ));
}

#[test]
fn test_inline_macro_becomes_local_function() {
    let source = r#"namespace App {
    static class MathUtil {
        @inline
        public static int clamp(int value, int max) {
            if (value > max) {
                return max;
            }
            return value;
        }
    }
    class Gauge {
        int read(int raw) {
            int shown = MathUtil.clamp(raw, 100);
            return shown;
        }
    }
}
"#;
    let text = expanded("gauge.lm", source);

    let start = text.find("int clamp_inline_").expect("inlined local function");
    let name_start = start + "int ".len();
    let name_end = name_start + text[name_start..].find('(').unwrap();
    let name = &text[name_start..name_end];
    assert!(name.starts_with("clamp_inline_13_"), "unexpected name {}", name);

    let read = text.find("int read(int raw)").unwrap();
    assert!(read < start, "local function belongs inside read");
    assert!(start < text.find("int shown =").unwrap());
    assert!(text.contains(&format!("int shown = {}(raw, 100);", name)));
    assert!(text.contains("int __result = default;"));
    assert!(text.contains(&format!("goto {}_exit;", name)));
    assert!(text.contains(&format!("{}_exit: return __result;", name)));
    assert_eq!(text.matches("return __result;").count(), 1);
}

#[test]
fn test_macro_reference_is_rejected() {
    let (program, result) = run(
        "refs.lm",
        r#"
static class Greetings {
    @pattern("\"Hi \" + ${name}")
    public static string greet(string name);
}
class Use {
    void run() {
        var f = Greetings.greet;
    }
}
"#,
    );
    assert!(!result.committed);
    assert_eq!(result.diagnostics.with_code("E7001").count(), 1);
    assert!(program.expanded().is_none());
}

#[test]
fn test_statement_macro_in_expression_position() {
    let (_, result) = run(
        "guard.lm",
        r#"
static class Guard {
    @statement_pattern("if (!${cond}) { return; }")
    public static void require(bool cond);

    @binding_pattern("${varType} ${varName} = ${value};")
    public static int keep(int value);
}
class Use {
    void run(bool ok) {
        var x = Guard.require(ok);
        int a = Guard.keep(1), b = 2;
        Guard.keep(3);
    }
}
"#,
    );
    assert!(!result.committed);
    assert_eq!(result.diagnostics.with_code("E7002").count(), 3);
}

#[test]
fn test_unsupported_default_and_unknown_placeholder() {
    let (_, result) = run(
        "limits.lm",
        r#"
static class Limits {
    public static int max = 10;

    @pattern("${a} + ${b}")
    public static int add(int a, int b = Limits.max);

    @pattern("${a} + ${missing}")
    public static int broken(int a);
}
class Use {
    int run() {
        return Limits.add(1) + Limits.broken(2);
    }
}
"#,
    );
    assert!(!result.committed);
    assert_eq!(result.diagnostics.with_code("E7004").count(), 1);
    assert_eq!(result.diagnostics.with_code("E7003").count(), 1);
    assert_eq!(result.diagnostics.with_code("E9001").count(), 0);
}

#[test]
fn test_malformed_macro_definitions() {
    let (_, result) = run(
        "defs.lm",
        r#"
static class Defs {
    @pattern
    public static int missingTemplate(int a);

    @inline
    public int notStatic(int a) {
        return a;
    }

    @inline
    public static int bodiless(int a);
}
"#,
    );
    assert_eq!(result.diagnostics.with_code("E6001").count(), 1);
    assert_eq!(result.diagnostics.with_code("E6002").count(), 2);
}
