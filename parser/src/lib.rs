//! Loom host-language parser
//!
//! A nom-based parser for `.lm` units, the canonical printer used to turn
//! rewritten trees back into source text, helpers for building small AST
//! fragments, and visitors for walking or mutating trees.

pub mod ast;
pub mod build;
pub mod custom_error;
pub mod parser;
pub mod parser_expr;
pub mod parser_stmt;
pub mod printer;
pub mod visit;

// Re-export diagnostics from the diagnostics crate
pub use diagnostics::*;

pub use ast::*;
pub use parser::{parse_expression, parse_members, parse_statements, parse_type, parse_unit, parse_unit_in};
pub use printer::{print_expr, print_member, print_stmt, print_type_decl, print_unit};
