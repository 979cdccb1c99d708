// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The binding & type oracle consumed by the rewrite engine.
//!
//! The engine never resolves names or infers types itself; it asks a
//! host-provided [`Oracle`] about the original (pre-transform) tree.
//! Keeping this boundary narrow makes every analysis pass testable
//! against the hand-built [`fake::FakeOracle`].

pub mod fake;

use quarry_ast::expr::Expr;
use quarry_ast::NodeId;

/// Unique identifier for a symbol known to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// The caching-scope block a declaration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Top level of the compilation unit.
    TopLevel,
    /// A function or arrow body, identified by its node.
    Function(NodeId),
}

/// Declaration-site facts about a symbol.
#[derive(Debug, Clone)]
pub struct DeclSite {
    /// The statement that introduces the symbol.
    pub statement: NodeId,
    /// The caching-scope block the statement lives in.
    pub container: Container,
    /// Whether the statement is a direct child of its container's
    /// statement list rather than nested in an inner block.
    pub direct: bool,
    /// Whether the walk from declaration to statement crosses a
    /// function parameter.
    pub is_parameter: bool,
    /// For variable declarations, whether an initializer is present.
    /// Imports and function declarations count as initialized.
    pub has_initializer: bool,
}

/// An inferred type, reduced to the alias symbol the engine compares
/// against the library's well-known types.
#[derive(Debug, Clone, Copy)]
pub struct TypeRef {
    pub alias: Option<SymbolId>,
}

/// Read-only binding and type resolution over the original tree.
///
/// The host may report distinct wrapper symbols for one generic
/// declaration, so two symbols denote the same well-known operation
/// iff [`Oracle::same_declaration`] holds — never by raw id equality.
pub trait Oracle {
    /// Symbol bound at an identifier or member-access node.
    fn symbol_at(&self, node: NodeId) -> Option<SymbolId>;

    /// Declaration-site facts for a symbol, when its declaration is
    /// placeable in the current unit.
    fn declaration_of(&self, symbol: SymbolId) -> Option<DeclSite>;

    /// The target a call expression resolves to.
    fn resolved_call_target(&self, call: NodeId) -> Option<SymbolId>;

    /// Return type of a resolved call.
    fn inferred_return_type(&self, call: NodeId) -> Option<TypeRef>;

    /// Inferred type of an arbitrary expression node.
    fn type_of(&self, node: NodeId) -> Option<TypeRef>;

    /// Exported `(name, symbol)` pairs of a module, if it resolves.
    fn exports_of(&self, module: &str) -> Option<Vec<(String, SymbolId)>>;

    /// A named member of a declared type.
    fn declared_type_property(&self, type_symbol: SymbolId, name: &str) -> Option<SymbolId>;

    /// The initializer of a variable declaration, from the original
    /// tree.
    fn var_initializer(&self, symbol: SymbolId) -> Option<&Expr>;

    /// Whether two symbols share a first declaration site.
    fn same_declaration(&self, a: SymbolId, b: SymbolId) -> bool;
}
