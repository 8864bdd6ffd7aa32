//! Canonical pretty printer
//!
//! Output is deterministic: four-space indentation, one member per line
//! group, and parentheses inserted wherever operator precedence requires
//! them. Printing a parsed tree and parsing the result gives back the same
//! structure.

use crate::ast::*;

const INDENT: &str = "    ";

/// Print a whole unit
pub fn print_unit(unit: &Unit) -> String {
    let mut printer = Printer::new();
    printer.items(&unit.items);
    printer.finish()
}

/// Print one type declaration
pub fn print_type_decl(decl: &TypeDecl) -> String {
    let mut printer = Printer::new();
    printer.type_decl(decl);
    printer.finish()
}

/// Print one member as it would appear inside a type body at indent zero
pub fn print_member(member: &Member) -> String {
    let mut printer = Printer::new();
    printer.member(member);
    printer.finish()
}

/// Print a statement at indent zero
pub fn print_stmt(stmt: &Stmt) -> String {
    let mut printer = Printer::new();
    printer.stmt(stmt);
    printer.finish()
}

/// Print an expression on one line
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new();
    printer.expr(expr);
    printer.out
}

/// Quote and escape a string value
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn finish(mut self) -> String {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out
    }

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn start_line(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn items(&mut self, items: &[Item]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            match item {
                Item::Namespace(ns) => self.namespace(ns),
                Item::Type(decl) => self.type_decl(decl),
            }
        }
    }

    fn namespace(&mut self, ns: &NamespaceDecl) {
        self.start_line();
        self.write("namespace ");
        self.write(&ns.path.join("."));
        self.write(" {");
        self.newline();
        self.indent += 1;
        self.items(&ns.items);
        self.indent -= 1;
        self.start_line();
        self.write("}");
        self.newline();
    }

    fn annotations_on_lines(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            self.start_line();
            self.annotation(annotation);
            self.newline();
        }
    }

    fn annotation(&mut self, annotation: &Annotation) {
        self.write("@");
        self.write(&annotation.name);
        if !annotation.args.is_empty() {
            self.arguments(&annotation.args);
        }
    }

    fn modifiers(&mut self, modifiers: &[Modifier]) {
        for modifier in modifiers {
            self.write(modifier.keyword());
            self.write(" ");
        }
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.write("<");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&param.name);
            match &param.constraint {
                Some(TypeConstraint::Class) => self.write(" : class"),
                Some(TypeConstraint::Struct) => self.write(" : struct"),
                Some(TypeConstraint::Type(ty)) => {
                    self.write(" : ");
                    self.write(&ty.to_string());
                }
                None => {}
            }
        }
        self.write(">");
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        self.annotations_on_lines(&decl.annotations);
        self.start_line();
        self.modifiers(&decl.modifiers);
        self.write(decl.kind.keyword());
        self.write(" ");
        self.write(&decl.name);
        self.type_params(&decl.type_params);
        if !decl.bases.is_empty() {
            let bases: Vec<String> = decl.bases.iter().map(|b| b.to_string()).collect();
            self.write(" : ");
            self.write(&bases.join(", "));
        }
        self.write(" {");
        self.newline();
        self.indent += 1;

        if decl.kind == TypeKind::Enum {
            for case in &decl.enum_cases {
                self.start_line();
                self.write(&case.name);
                if let Some(value) = &case.value {
                    self.write(" = ");
                    self.expr(value);
                }
                self.write(",");
                self.newline();
            }
        } else {
            for (i, member) in decl.members.iter().enumerate() {
                if i > 0 {
                    self.newline();
                }
                self.member(member);
            }
        }

        self.indent -= 1;
        self.start_line();
        self.write("}");
        self.newline();
    }

    fn member(&mut self, member: &Member) {
        match member {
            Member::Field(field) => {
                self.annotations_on_lines(&field.annotations);
                self.start_line();
                self.modifiers(&field.modifiers);
                self.write(&field.ty.to_string());
                self.write(" ");
                self.write(&field.name);
                if let Some(init) = &field.init {
                    self.write(" = ");
                    self.expr(init);
                }
                self.write(";");
                self.newline();
            }
            Member::Property(prop) => {
                self.annotations_on_lines(&prop.annotations);
                self.start_line();
                self.modifiers(&prop.modifiers);
                self.write(&prop.ty.to_string());
                self.write(" ");
                self.write(&prop.name);
                self.write(" {");
                if prop.getter {
                    self.write(" get;");
                }
                if prop.setter {
                    self.write(" set;");
                }
                self.write(" }");
                if let Some(init) = &prop.init {
                    self.write(" = ");
                    self.expr(init);
                    self.write(";");
                }
                self.newline();
            }
            Member::Method(method) => self.method(method),
            Member::Constructor(ctor) => {
                self.annotations_on_lines(&ctor.annotations);
                self.start_line();
                self.modifiers(&ctor.modifiers);
                self.write(&ctor.name);
                self.params(&ctor.params);
                self.write(" ");
                self.block(&ctor.body);
                self.newline();
            }
            Member::Type(decl) => self.type_decl(decl),
        }
    }

    /// Method or local function starting at a fresh line
    fn method(&mut self, method: &MethodDecl) {
        self.annotations_on_lines(&method.annotations);
        self.start_line();
        self.method_header(method);
        self.newline();
    }

    fn method_header(&mut self, method: &MethodDecl) {
        self.modifiers(&method.modifiers);
        self.write(&method.return_type.to_string());
        self.write(" ");
        self.write(&method.name);
        self.type_params(&method.type_params);
        self.params(&method.params);
        match &method.body {
            Some(Body::Block(block)) => {
                self.write(" ");
                self.block(block);
            }
            Some(Body::Expr(expr)) => {
                self.write(" => ");
                self.expr(expr);
                self.write(";");
            }
            None => self.write(";"),
        }
    }

    fn params(&mut self, params: &[Param]) {
        self.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            for annotation in &param.annotations {
                self.annotation(annotation);
                self.write(" ");
            }
            self.write(&param.ty.to_string());
            self.write(" ");
            self.write(&param.name);
            if let Some(default) = &param.default {
                self.write(" = ");
                self.expr(default);
            }
        }
        self.write(")");
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Block starting at the current position, closing brace on its own line
    fn block(&mut self, block: &Block) {
        self.write("{");
        self.newline();
        self.indent += 1;
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
        self.start_line();
        self.write("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        self.start_line();
        self.stmt_inline(stmt);
        self.newline();
    }

    /// Statement text without leading indent or trailing newline
    fn stmt_inline(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block(block) => self.block(block),
            StmtKind::Local(local) => {
                match &local.ty {
                    Some(ty) => self.write(&ty.to_string()),
                    None => self.write("var"),
                }
                self.write(" ");
                for (i, declarator) in local.declarators.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.write(&declarator.name);
                    if let Some(init) = &declarator.init {
                        self.write(" = ");
                        self.expr(init);
                    }
                }
                self.write(";");
            }
            StmtKind::Expr(expr) => {
                self.expr(expr);
                self.write(";");
            }
            StmtKind::Return(value) => match value {
                Some(value) => {
                    self.write("return ");
                    self.expr(value);
                    self.write(";");
                }
                None => self.write("return;"),
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.write("if (");
                self.expr(cond);
                self.write(")");
                self.nested(then_branch);
                if let Some(else_branch) = else_branch {
                    if matches!(then_branch.kind, StmtKind::Block(_)) {
                        self.write(" else");
                    } else {
                        self.newline();
                        self.start_line();
                        self.write("else");
                    }
                    if matches!(else_branch.kind, StmtKind::If { .. }) {
                        self.write(" ");
                        self.stmt_inline(else_branch);
                    } else {
                        self.nested(else_branch);
                    }
                }
            }
            StmtKind::While { cond, body } => {
                self.write("while (");
                self.expr(cond);
                self.write(")");
                self.nested(body);
            }
            StmtKind::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                self.write("foreach (");
                match ty {
                    Some(ty) => self.write(&ty.to_string()),
                    None => self.write("var"),
                }
                self.write(" ");
                self.write(name);
                self.write(" in ");
                self.expr(iterable);
                self.write(")");
                self.nested(body);
            }
            StmtKind::Throw(value) => {
                self.write("throw ");
                self.expr(value);
                self.write(";");
            }
            StmtKind::Break => self.write("break;"),
            StmtKind::Continue => self.write("continue;"),
            StmtKind::Goto(label) => {
                self.write("goto ");
                self.write(label);
                self.write(";");
            }
            StmtKind::Labeled { label, stmt } => {
                self.write(label);
                self.write(": ");
                self.stmt_inline(stmt);
            }
            StmtKind::LocalFunction(method) => {
                for annotation in &method.annotations {
                    self.annotation(annotation);
                    self.write(" ");
                }
                self.method_header(method);
            }
            StmtKind::Empty => self.write(";"),
        }
    }

    /// Body of a control statement: blocks stay on the header line, anything
    /// else goes on its own indented line
    fn nested(&mut self, stmt: &Stmt) {
        if matches!(stmt.kind, StmtKind::Block(_)) {
            self.write(" ");
            self.stmt_inline(stmt);
        } else {
            self.newline();
            self.indent += 1;
            self.start_line();
            self.stmt_inline(stmt);
            self.indent -= 1;
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(literal) => self.literal(literal),
            ExprKind::Ident(name) => self.write(name),
            ExprKind::This => self.write("this"),
            ExprKind::Member { target, name } => {
                self.operand(target, prec::POSTFIX);
                self.write(".");
                self.write(name);
            }
            ExprKind::Call { callee, args } => {
                self.operand(callee, prec::POSTFIX);
                self.arguments(args);
            }
            ExprKind::New { ty, args } => {
                self.write("new ");
                self.write(&ty.to_string());
                self.arguments(args);
            }
            ExprKind::Default(ty) => match ty {
                Some(ty) => {
                    self.write("default(");
                    self.write(&ty.to_string());
                    self.write(")");
                }
                None => self.write("default"),
            },
            ExprKind::Cast { ty, expr } => {
                self.write("(");
                self.write(&ty.to_string());
                self.write(")");
                // anything looser than a primary would read as a parenthesized value
                self.operand(expr, prec::POSTFIX);
            }
            ExprKind::Is { expr, ty, binding } => {
                self.operand(expr, prec::RELATIONAL);
                self.write(" is ");
                self.write(&ty.to_string());
                if let Some(binding) = binding {
                    self.write(" ");
                    self.write(binding);
                }
            }
            ExprKind::Unary { op, expr } => {
                self.write(op.symbol());
                self.operand(expr, prec::UNARY);
            }
            ExprKind::Binary { op, left, right } => {
                let p = op.precedence();
                if op.is_right_associative() {
                    self.operand(left, p + 1);
                    self.write(" ");
                    self.write(op.symbol());
                    self.write(" ");
                    self.operand(right, p);
                } else {
                    self.operand(left, p);
                    self.write(" ");
                    self.write(op.symbol());
                    self.write(" ");
                    self.operand(right, p + 1);
                }
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.operand(cond, prec::COALESCE);
                self.write(" ? ");
                self.operand(then_expr, prec::CONDITIONAL);
                self.write(" : ");
                self.operand(else_expr, prec::CONDITIONAL);
            }
            ExprKind::Assign { op, target, value } => {
                self.operand(target, prec::POSTFIX);
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.operand(value, prec::ASSIGN);
            }
            ExprKind::Index { target, index } => {
                self.operand(target, prec::POSTFIX);
                self.write("[");
                self.expr(index);
                self.write("]");
            }
            ExprKind::Paren(inner) => {
                self.write("(");
                self.expr(inner);
                self.write(")");
            }
        }
    }

    /// Print `expr`, parenthesized when it binds looser than `min_prec`
    fn operand(&mut self, expr: &Expr, min_prec: u8) {
        if expr.precedence() < min_prec {
            self.write("(");
            self.expr(expr);
            self.write(")");
        } else {
            self.expr(expr);
        }
    }

    fn arguments(&mut self, args: &[Argument]) {
        self.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            if let Some(name) = &arg.name {
                self.write(name);
                self.write(": ");
            }
            self.expr(&arg.value);
        }
        self.write(")");
    }

    fn literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Int { value, long } => {
                self.write(&value.to_string());
                if *long {
                    self.write("L");
                }
            }
            Literal::Float(text) => self.write(text),
            Literal::String(value) => self.write(&quote_string(value)),
            Literal::Bool(value) => self.write(if *value { "true" } else { "false" }),
            Literal::Null => self.write("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_unit};

    /// Parse, print, re-parse, print again: both printed forms must agree
    fn assert_stable(text: &str) -> String {
        let unit = parse_unit("a.lm", text).expect("source should parse");
        let printed = print_unit(&unit);
        let reparsed = parse_unit("a.lm", &printed).expect("printed source should parse");
        assert_eq!(printed, print_unit(&reparsed));
        printed
    }

    #[test]
    fn test_print_is_stable() {
        let printed = assert_stable(
            r#"
            namespace Geo {
                @record(hash: false)
                public partial struct Point<T : class> : IShape {
                    public int x; public T tag = default;
                    public int Area { get; } = 0;
                    Point(int x) { this.x = x; }
                    public override string toString() => "Point(" + x + ")";
                    void run(@implicit Logger logger, int n = 3) {
                        var a = 1, b;
                        if (a > 0) return; else if (a < 0) { a = -a; } else throw new Error("x");
                        while (a < 10) a += 1;
                        foreach (int i in items) { continue; }
                        done: return;
                    }
                }
                enum Color : long { Red = 1, Green, }
            }
            "#,
        );
        assert!(printed.contains("namespace Geo {\n    @record(hash: false)\n"));
        assert!(printed.contains("        public int x;\n"));
    }

    #[test]
    fn test_parenthesizes_by_precedence() {
        let sum = parse_expression("a + b").unwrap();
        let c = parse_expression("c").unwrap();
        let product = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Mul,
                left: Box::new(sum),
                right: Box::new(c),
            },
            Span::default(),
        );
        assert_eq!(print_expr(&product), "(a + b) * c");
    }

    #[test]
    fn test_left_associative_chains_print_without_parens() {
        let expr = parse_expression("\"P(x: \" + x + \")\"").unwrap();
        assert_eq!(print_expr(&expr), "\"P(x: \" + x + \")\"");
        let expr = parse_expression("a - (b - c)").unwrap();
        assert_eq!(print_expr(&expr), "a - (b - c)");
    }

    #[test]
    fn test_cast_of_unary_keeps_parens() {
        let neg = parse_expression("-x").unwrap();
        let cast = Expr::new(
            ExprKind::Cast {
                ty: TypeRef::simple("int"),
                expr: Box::new(neg),
            },
            Span::default(),
        );
        let printed = print_expr(&cast);
        assert_eq!(printed, "(int)(-x)");
        assert!(matches!(
            parse_expression(&printed).unwrap().kind,
            ExprKind::Cast { .. }
        ));
    }

    #[test]
    fn test_string_escapes_round_trip() {
        assert_eq!(quote_string("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }
}
