// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Renderer from the tree back to source text.
//!
//! Output is deterministic and unopinionated: one statement per line,
//! tab indentation, no precedence games. It exists for diagnostics
//! (quoting expression text) and for asserting over transformed
//! output, not for producing publishable formatting.

mod printer;

pub use printer::Printer;

use quarry_ast::expr::Expr;
use quarry_ast::stmt::Stmt;
use quarry_ast::SourceFile;

/// Render a whole file.
pub fn print_unit(file: &SourceFile) -> String {
    let mut p = Printer::new();
    p.emit_unit(file);
    p.finish()
}

/// Render a single expression on one line.
pub fn expr_text(expr: &Expr) -> String {
    let mut p = Printer::new();
    p.emit_expr(expr);
    p.finish_inline()
}

/// Render a single statement.
pub fn stmt_text(stmt: &Stmt) -> String {
    let mut p = Printer::new();
    p.emit_stmt(stmt);
    p.finish()
}
