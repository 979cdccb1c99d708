// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Syntax tree types for the quarry rewrite engine.
//!
//! This crate defines the statement/expression tree shared between the
//! analysis passes and the output renderer. The tree carries no source
//! positions and no parent pointers — the host parser owns those. The
//! engine relies on node identity only, so statement rebuilds preserve
//! their ids and position lookups keep working after a transform.

pub mod expr;
pub mod factory;
pub mod stmt;

pub use factory::NodeFactory;

use stmt::Stmt;

/// Unique identifier for tree nodes.
///
/// Assigned by the host parser for source nodes, and by [`NodeFactory`]
/// (from a reserved high range) for synthesized nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}

/// One file of a compilation unit: a flat list of top-level statements.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: NodeId,
    pub statements: Vec<Stmt>,
}
