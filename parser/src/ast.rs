//! Loom source AST with span tracking
//!
//! Every expression, statement, member and type declaration carries a
//! `NodeId` that is unique within its unit once `number_nodes` has run. The
//! synthesis engine keys its edits by these ids, so they must survive from
//! discovery to rewriting untouched.

use std::fmt;

use crate::visit::{self, VisitMut};

/// Source location information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the start (inclusive)
    pub start: usize,
    /// Byte offset of the end (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Identity of a node inside one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id carried by nodes that were built in memory and never numbered
    pub const DUMMY: NodeId = NodeId(0);

    pub fn is_dummy(self) -> bool {
        self == Self::DUMMY
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parsed translation unit
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub path: String,
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level or namespace-level item
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Namespace(NamespaceDecl),
    Type(TypeDecl),
}

/// `namespace A.B { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub path: Vec<String>,
    pub items: Vec<Item>,
    pub span: Span,
}

/// Declaration modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Internal,
    Static,
    Abstract,
    Sealed,
    Partial,
    Readonly,
    Override,
    Virtual,
    Const,
}

impl Modifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Private => "private",
            Modifier::Protected => "protected",
            Modifier::Internal => "internal",
            Modifier::Static => "static",
            Modifier::Abstract => "abstract",
            Modifier::Sealed => "sealed",
            Modifier::Partial => "partial",
            Modifier::Readonly => "readonly",
            Modifier::Override => "override",
            Modifier::Virtual => "virtual",
            Modifier::Const => "const",
        }
    }

    pub const ALL: [Modifier; 12] = [
        Modifier::Public,
        Modifier::Private,
        Modifier::Protected,
        Modifier::Internal,
        Modifier::Static,
        Modifier::Abstract,
        Modifier::Sealed,
        Modifier::Partial,
        Modifier::Readonly,
        Modifier::Override,
        Modifier::Virtual,
        Modifier::Const,
    ];
}

/// Annotation: `@record`, `@pattern("...")`, `@record(hash: false)`
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub name: String,
    pub args: Vec<Argument>,
    pub span: Span,
}

impl Annotation {
    /// Named argument lookup
    pub fn named(&self, name: &str) -> Option<&Expr> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }

    /// Positional arguments in order
    pub fn positional(&self) -> impl Iterator<Item = &Expr> {
        self.args.iter().filter(|a| a.name.is_none()).map(|a| &a.value)
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Enum => "enum",
        }
    }
}

/// Constraint on a generic parameter: `T : class`, `T : struct`, `T : Shape`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeConstraint {
    Class,
    Struct,
    Type(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<TypeConstraint>,
}

/// Syntactic reference to a type: `List<int>?[]`
///
/// Equality is structural and ignores source position, which is what implicit
/// slot matching relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Dotted name as written (`int`, `Geo.Point`)
    pub name: String,
    pub args: Vec<TypeRef>,
    pub nullable: bool,
    pub array_rank: usize,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            nullable: false,
            array_rank: 0,
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
            nullable: false,
            array_rank: 0,
        }
    }

    pub fn void() -> Self {
        Self::simple("void")
    }

    pub fn is_void(&self) -> bool {
        self.name == "void" && self.args.is_empty() && self.array_rank == 0
    }

    /// Same type wrapped as `T?`
    pub fn to_nullable(&self) -> Self {
        Self {
            nullable: true,
            ..self.clone()
        }
    }

    /// Last segment of a dotted name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        for _ in 0..self.array_rank {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// Class, struct, interface or enum declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub kind: TypeKind,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Base class and interfaces; for enums, the underlying integral type
    pub bases: Vec<TypeRef>,
    pub members: Vec<Member>,
    pub enum_cases: Vec<EnumCase>,
    pub span: Span,
}

impl TypeDecl {
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_partial(&self) -> bool {
        self.has_modifier(Modifier::Partial)
    }

    pub fn is_static(&self) -> bool {
        self.has_modifier(Modifier::Static)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumCase {
    pub name: String,
    pub value: Option<Expr>,
    pub span: Span,
}

/// Member of a type declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Property(PropertyDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Type(TypeDecl),
}

impl Member {
    pub fn id(&self) -> NodeId {
        match self {
            Member::Field(f) => f.id,
            Member::Property(p) => p.id,
            Member::Method(m) => m.id,
            Member::Constructor(c) => c.id,
            Member::Type(t) => t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Field(f) => &f.name,
            Member::Property(p) => &p.name,
            Member::Method(m) => &m.name,
            Member::Constructor(c) => &c.name,
            Member::Type(t) => &t.name,
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Member::Field(f) => &f.annotations,
            Member::Property(p) => &p.annotations,
            Member::Method(m) => &m.annotations,
            Member::Constructor(c) => &c.annotations,
            Member::Type(t) => &t.annotations,
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        match self {
            Member::Field(f) => &f.modifiers,
            Member::Property(p) => &p.modifiers,
            Member::Method(m) => &m.modifiers,
            Member::Constructor(c) => &c.modifiers,
            Member::Type(t) => &t.modifiers,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Member::Field(f) => f.span,
            Member::Property(p) => p.span,
            Member::Method(m) => m.span,
            Member::Constructor(c) => c.span,
            Member::Type(t) => t.span,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers().contains(&Modifier::Static)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Auto-property: `int X { get; set; } = 1;`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub ty: TypeRef,
    pub name: String,
    pub getter: bool,
    pub setter: bool,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub return_type: TypeRef,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub body: Option<Body>,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

/// Method body: a block or an expression (`=> expr;`)
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Block(Block),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub id: NodeId,
    pub annotations: Vec<Annotation>,
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    pub name: String,
    pub default: Option<Expr>,
    pub span: Span,
}

impl Param {
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block(Block),
    /// `var a = 1, b = 2;` or `int a;`
    Local(LocalDecl),
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    ForEach {
        ty: Option<TypeRef>,
        name: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Throw(Expr),
    Break,
    Continue,
    Goto(String),
    Labeled {
        label: String,
        stmt: Box<Stmt>,
    },
    LocalFunction(Box<MethodDecl>),
    Empty,
}

/// Local variable declaration group
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    /// `None` for `var`
    pub ty: Option<TypeRef>,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Ident(String),
    This,
    Member {
        target: Box<Expr>,
        name: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    New {
        ty: TypeRef,
        args: Vec<Argument>,
    },
    /// `default` or `default(T)`
    Default(Option<TypeRef>),
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
    },
    /// `e is T` or `e is T name`
    Is {
        expr: Box<Expr>,
        ty: TypeRef,
        binding: Option<String>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Paren(Box<Expr>),
}

/// Call or annotation argument, optionally named (`name: value`)
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int { value: i64, long: bool },
    /// Raw text as written, suffix included
    Float(String),
    /// Unescaped string value
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Coalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Coalesce => prec::COALESCE,
            BinaryOp::Or => prec::OR,
            BinaryOp::And => prec::AND,
            BinaryOp::BitOr => prec::BIT_OR,
            BinaryOp::BitXor => prec::BIT_XOR,
            BinaryOp::BitAnd => prec::BIT_AND,
            BinaryOp::Eq | BinaryOp::NotEq => prec::EQUALITY,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => prec::RELATIONAL,
            BinaryOp::Shl | BinaryOp::Shr => prec::SHIFT,
            BinaryOp::Add | BinaryOp::Sub => prec::ADDITIVE,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => prec::MULTIPLICATIVE,
        }
    }

    /// `??` groups to the right, everything else to the left
    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOp::Coalesce)
    }
}

/// Expression precedence levels shared by the parser and the printer
pub mod prec {
    pub const ASSIGN: u8 = 1;
    pub const CONDITIONAL: u8 = 2;
    pub const COALESCE: u8 = 3;
    pub const OR: u8 = 4;
    pub const AND: u8 = 5;
    pub const BIT_OR: u8 = 6;
    pub const BIT_XOR: u8 = 7;
    pub const BIT_AND: u8 = 8;
    pub const EQUALITY: u8 = 9;
    pub const RELATIONAL: u8 = 10;
    pub const SHIFT: u8 = 11;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 13;
    pub const UNARY: u8 = 14;
    pub const POSTFIX: u8 = 15;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Coalesce,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Coalesce => "??=",
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            id: NodeId::DUMMY,
            kind,
            span,
        }
    }

    /// Binding strength of this expression's outermost operator
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Assign { .. } => prec::ASSIGN,
            ExprKind::Conditional { .. } => prec::CONDITIONAL,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Is { .. } => prec::RELATIONAL,
            ExprKind::Unary { .. } | ExprKind::Cast { .. } => prec::UNARY,
            _ => prec::POSTFIX,
        }
    }

    /// Identifiers, literals, member accesses, calls and the like
    pub fn is_primary(&self) -> bool {
        self.precedence() == prec::POSTFIX
    }
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            id: NodeId::DUMMY,
            kind,
            span,
        }
    }
}

/// Assigns fresh, unit-unique ids to every numbered node, in document order.
/// Returns the next unused id.
pub fn number_nodes(unit: &mut Unit) -> u32 {
    let mut numbering = Numbering { next: 1 };
    numbering.visit_unit(unit);
    numbering.next
}

struct Numbering {
    next: u32,
}

impl Numbering {
    fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl VisitMut for Numbering {
    fn visit_type_decl(&mut self, decl: &mut TypeDecl) {
        decl.id = self.fresh();
        visit::walk_type_decl_mut(self, decl);
    }

    fn visit_member(&mut self, member: &mut Member) {
        match member {
            Member::Field(f) => f.id = self.fresh(),
            Member::Property(p) => p.id = self.fresh(),
            Member::Method(m) => m.id = self.fresh(),
            Member::Constructor(c) => c.id = self.fresh(),
            // nested types are numbered by visit_type_decl
            Member::Type(_) => {}
        }
        visit::walk_member_mut(self, member);
    }

    fn visit_local_function(&mut self, method: &mut MethodDecl) {
        method.id = self.fresh();
        visit::walk_method_mut(self, method);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        stmt.id = self.fresh();
        visit::walk_stmt_mut(self, stmt);
    }

    fn visit_expr(&mut self, expr: &mut Expr) {
        expr.id = self.fresh();
        visit::walk_expr_mut(self, expr);
    }
}
