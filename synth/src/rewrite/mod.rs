//! Scheduled tree edits
//!
//! Discovery and the implicit solver never touch a tree directly. They
//! schedule edits keyed by the `NodeId` of the node to change, and the
//! rewriter applies every edit of a unit in one post-order pass. An edit
//! still scheduled after the pass is reported as unapplied.

pub mod rewriter;

use crate::semantic::MethodId;
use diagnostics::SourceSpan;
use fxhash::FxHashMap;
use parser::{Argument, NodeId, Param};

pub use rewriter::rewrite_unit;

/// Change to one expression
#[derive(Debug, Clone)]
pub enum ExprEdit {
    /// Replace a `@pattern` call with its expansion
    Expand { macro_id: MethodId },
    /// Call a local-function copy of an `@inline` method instead
    Inline { macro_id: MethodId, name: String },
    /// Append resolved implicit arguments to a call or `new`
    AppendArgs(Vec<Argument>),
}

/// Change to one statement
#[derive(Debug, Clone, Copy)]
pub enum StmtEdit {
    /// Replace an expression statement calling a `@statement_pattern`
    ExpandStatement { macro_id: MethodId },
    /// Replace a one-variable declaration initialized by a `@binding_pattern`
    ExpandBinding { macro_id: MethodId },
}

/// Change to one member declaration
#[derive(Debug, Clone)]
pub enum MemberEdit {
    /// Add `@implicit` parameters to a pass-through method
    AddParams(Vec<Param>),
}

#[derive(Debug, Clone)]
pub struct Scheduled<E> {
    pub edit: E,
    pub span: SourceSpan,
}

impl ExprEdit {
    pub fn describe(&self) -> String {
        match self {
            ExprEdit::Expand { .. } => "expand pattern macro".to_string(),
            ExprEdit::Inline { name, .. } => format!("inline as '{}'", name),
            ExprEdit::AppendArgs(args) => format!("append {} implicit arguments", args.len()),
        }
    }
}

impl StmtEdit {
    pub fn describe(&self) -> &'static str {
        match self {
            StmtEdit::ExpandStatement { .. } => "expand statement macro",
            StmtEdit::ExpandBinding { .. } => "expand binding macro",
        }
    }
}

impl MemberEdit {
    pub fn describe(&self) -> String {
        match self {
            MemberEdit::AddParams(params) => format!("add {} implicit parameters", params.len()),
        }
    }
}

/// Every edit scheduled for one unit
#[derive(Debug, Clone, Default)]
pub struct UnitEdits {
    pub(crate) exprs: FxHashMap<NodeId, Scheduled<ExprEdit>>,
    pub(crate) stmts: FxHashMap<NodeId, Scheduled<StmtEdit>>,
    pub(crate) members: FxHashMap<NodeId, Scheduled<MemberEdit>>,
}

impl UnitEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expr(&mut self, node: NodeId, edit: ExprEdit, span: SourceSpan) {
        self.exprs.insert(node, Scheduled { edit, span });
    }

    pub fn stmt(&mut self, node: NodeId, edit: StmtEdit, span: SourceSpan) {
        self.stmts.insert(node, Scheduled { edit, span });
    }

    pub fn member(&mut self, node: NodeId, edit: MemberEdit, span: SourceSpan) {
        self.members.insert(node, Scheduled { edit, span });
    }

    /// Append implicit arguments, merging with arguments already scheduled
    pub fn append_args(&mut self, node: NodeId, args: Vec<Argument>, span: SourceSpan) {
        match self.exprs.get_mut(&node) {
            Some(Scheduled {
                edit: ExprEdit::AppendArgs(existing),
                ..
            }) => existing.extend(args),
            _ => self.expr(node, ExprEdit::AppendArgs(args), span),
        }
    }

    pub fn merge(&mut self, other: UnitEdits) {
        for (node, scheduled) in other.exprs {
            match scheduled.edit {
                ExprEdit::AppendArgs(args) => self.append_args(node, args, scheduled.span),
                edit => self.expr(node, edit, scheduled.span),
            }
        }
        self.stmts.extend(other.stmts);
        self.members.extend(other.members);
    }

    pub fn len(&self) -> usize {
        self.exprs.len() + self.stmts.len() + self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
