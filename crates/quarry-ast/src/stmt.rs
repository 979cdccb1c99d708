// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement AST nodes.

use crate::expr::{BindingName, Expr};
use crate::NodeId;

/// A statement in the tree.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// Expression statement
    Expr(Expr),
    /// Variable declaration list (`let a = 1, b;`)
    VarDecl {
        kind: VarKind,
        decls: Vec<Declarator>,
    },
    /// Destructuring iteration (`for (const [e, a] of src) body`)
    ForOf {
        decl_kind: VarKind,
        pattern: BindingName,
        source: Expr,
        body: Box<Stmt>,
    },
    /// Descending inclusive integer range
    /// (`for (let i = from; i >= to; i--) body`)
    ForRange {
        var: String,
        from: Expr,
        to: Expr,
        body: Box<Stmt>,
    },
    /// While loop
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// If statement
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// Block statement
    Block(Vec<Stmt>),
    /// Break statement
    Break,
    /// Continue statement
    Continue,
    /// Return statement
    Return(Option<Expr>),
    /// Switch statement
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
    },
    /// Function declaration
    Function(FnDecl),
    /// Import declaration (`import { a, b } from "mod";`)
    Import {
        names: Vec<String>,
        module: String,
    },
    /// Empty statement; used as the splice placeholder marker
    Empty,
}

/// Declaration keyword of a variable statement or loop binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Let,
    Const,
}

/// One declarator of a variable declaration list.
#[derive(Debug, Clone)]
pub struct Declarator {
    pub name: BindingName,
    pub init: Option<Expr>,
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<BindingName>,
    pub body: Vec<Stmt>,
}

/// One arm of a switch statement; `test` is `None` for `default`.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

impl Stmt {
    /// Whether this statement is the given placeholder marker.
    pub fn is_marker(&self, id: NodeId) -> bool {
        self.id == id && matches!(self.kind, StmtKind::Empty)
    }
}
