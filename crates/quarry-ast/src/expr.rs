// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::stmt::Stmt;
use crate::NodeId;

/// An expression in the tree.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    /// Leading trivia (comment text) carried over by the host parser.
    /// The `no-cache` opt-out marker is looked up here.
    pub trivia: Option<String>,
}

impl Expr {
    /// Whether the leading trivia contains the given marker token.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.trivia.as_deref().is_some_and(|t| t.contains(marker))
    }
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Identifier reference
    Ident(String),
    /// Number literal
    Number(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Bool(bool),
    /// The undefined value
    Undefined,
    /// Property access (`a.b`); `private_name` marks `a.#b`-style members
    Member {
        object: Box<Expr>,
        property: String,
        private_name: bool,
    },
    /// Element access (`a[i]`)
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    /// Call expression
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Arrow function; the body opens a caching scope
    Arrow {
        params: Vec<BindingName>,
        body: Vec<Stmt>,
    },
    /// Assignment (`a = b`)
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Conditional (`c ? t : f`)
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Spread (`...xs`)
    Spread(Box<Expr>),
    /// Array literal (`[a, b]`)
    Array(Vec<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Lt,
    Gt,
    Identical,
    NotIdentical,
    And,
    Or,
}

/// A binding pattern, as found in declarations and parameter lists.
#[derive(Debug, Clone)]
pub enum BindingName {
    /// Plain identifier binding
    Ident(String),
    /// Array destructuring (`[a, , b]`)
    Array(Vec<ArrayBindingElem>),
    /// Object destructuring (`{ a, b }`)
    Object(Vec<String>),
}

/// One slot of an array destructuring pattern.
#[derive(Debug, Clone)]
pub enum ArrayBindingElem {
    /// An elided slot (`[, x]`)
    Omitted,
    /// A bound identifier
    Ident(String),
}
