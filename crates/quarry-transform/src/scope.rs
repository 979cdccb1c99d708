// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Per-scope bookkeeping for hoisted cache code.
//!
//! One [`ScopeCache`] exists per lexical block that can host hoisted
//! declarations (function body or top-level unit). It never rejects
//! input; it only accumulates, and is consumed once at scope close.

use indexmap::IndexSet;
use quarry_ast::expr::Expr;
use quarry_ast::stmt::{Stmt, StmtKind, VarKind};
use quarry_ast::{NodeFactory, NodeId};

use crate::classify::Prerequisite;

pub(crate) struct ScopeCache {
    /// The block this scope owns.
    #[allow(dead_code)]
    pub node: NodeId,
    /// Statements that must exist before this scope's hoisted code.
    requires: IndexSet<NodeId>,
    /// Spliced once, after the last required statement.
    outer: Vec<Stmt>,
    /// Re-run every time a dynamically bound owner changes identity.
    inner: Vec<Stmt>,
    /// Identity guard over the inner statements.
    condition: Option<Expr>,
    /// Placeholder used to locate the inner splice point after the
    /// statement list has itself been transformed.
    marker: Option<NodeId>,
}

impl ScopeCache {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            requires: IndexSet::new(),
            outer: Vec::new(),
            inner: Vec::new(),
            condition: None,
            marker: None,
        }
    }

    /// Register prerequisite statements, deduplicated by identity.
    pub fn require(&mut self, prereqs: &[Prerequisite]) {
        for p in prereqs {
            self.requires.insert(p.statement);
        }
    }

    pub fn outer_result(&mut self, stmt: Stmt) {
        self.outer.push(stmt);
    }

    /// Append statements that must re-run on owner change. On first
    /// use, returns the placeholder marker; the caller files it as a
    /// prerequisite at the current traversal position.
    pub fn inner_result(&mut self, stmts: Vec<Stmt>, factory: &mut NodeFactory) -> Option<Stmt> {
        let marker = if self.marker.is_none() {
            let marker = factory.empty();
            self.marker = Some(marker.id);
            Some(marker)
        } else {
            None
        };
        self.inner.extend(stmts);
        marker
    }

    /// Idempotently install the owner-identity invalidation check:
    /// a scope-local last-seen-owner slot, unset at scope entry, and a
    /// strict-inequality guard around all inner statements.
    pub fn conditioned(&mut self, owner: &Expr, factory: &mut NodeFactory) -> Option<Stmt> {
        if self.condition.is_some() {
            return None;
        }
        let key = factory.unique_name("ownerKey");
        let key_ref = factory.ident(key.clone());
        self.condition = Some(factory.not_identical(key_ref, owner.clone()));
        self.outer.push(factory.single_decl(VarKind::Let, key.clone(), None));
        let key_target = factory.ident(key);
        let update = factory.assign(key_target, owner.clone());
        let update_stmt = factory.expr_stmt(update);
        self.inner_result(vec![update_stmt], factory)
    }

    /// Splice accumulated results into the scope's transformed
    /// statement list: inner statements replace the placeholder
    /// wherever it landed; outer statements land after the last
    /// required statement still present in this scope.
    pub fn flush(self, mut stmts: Vec<Stmt>, factory: &mut NodeFactory) -> Vec<Stmt> {
        let ScopeCache {
            requires,
            outer,
            inner,
            condition,
            marker,
            ..
        } = self;

        if let Some(marker) = marker {
            let inner = match condition {
                Some(cond) => {
                    let block = factory.block(inner);
                    vec![factory.if_stmt(cond, block, None)]
                }
                None => inner,
            };
            splice_at_marker(&mut stmts, marker, &inner);
        }

        let at = requires
            .iter()
            .filter_map(|id| stmts.iter().position(|s| s.id == *id).map(|i| i + 1))
            .max()
            .unwrap_or(0);
        stmts.splice(at..at, outer);
        stmts
    }
}

/// Replace the placeholder statement with `replacement`, searching the
/// whole statement tree by identity.
fn splice_at_marker(stmts: &mut Vec<Stmt>, marker: NodeId, replacement: &[Stmt]) -> bool {
    if let Some(pos) = stmts.iter().position(|s| s.is_marker(marker)) {
        stmts.splice(pos..pos + 1, replacement.iter().cloned());
        return true;
    }
    stmts
        .iter_mut()
        .any(|stmt| splice_in_stmt(stmt, marker, replacement))
}

fn splice_in_stmt(stmt: &mut Stmt, marker: NodeId, replacement: &[Stmt]) -> bool {
    match &mut stmt.kind {
        StmtKind::Block(stmts) => splice_at_marker(stmts, marker, replacement),
        StmtKind::ForOf { body, .. }
        | StmtKind::ForRange { body, .. }
        | StmtKind::While { body, .. } => splice_in_stmt(body, marker, replacement),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            splice_in_stmt(then_branch, marker, replacement)
                || else_branch
                    .as_deref_mut()
                    .is_some_and(|e| splice_in_stmt(e, marker, replacement))
        }
        StmtKind::Switch { cases, .. } => cases
            .iter_mut()
            .any(|case| splice_at_marker(&mut case.body, marker, replacement)),
        StmtKind::Function(f) => splice_at_marker(&mut f.body, marker, replacement),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_ast::expr::ExprKind;

    fn prereq(statement: NodeId) -> Prerequisite {
        Prerequisite {
            statement,
            top_level: true,
        }
    }

    #[test]
    fn outer_results_land_after_the_last_required_statement() {
        let mut f = NodeFactory::new();
        let first = f.import(vec!["A".into()], "./ecs");
        let second = f.import(vec!["B".into()], "./ecs");
        let trailing = f.empty();
        let required = [prereq(first.id), prereq(second.id)];

        let mut cache = ScopeCache::new(f.fresh_id());
        cache.require(&required);
        let hoisted = f.single_decl(VarKind::Const, "query_1", None);
        let hoisted_id = hoisted.id;
        cache.outer_result(hoisted);

        let out = cache.flush(vec![first, second, trailing], &mut f);
        assert_eq!(out.len(), 4);
        assert_eq!(out[2].id, hoisted_id);
    }

    #[test]
    fn unknown_requires_insert_at_scope_entry() {
        let mut f = NodeFactory::new();
        let body_stmt = f.empty();
        // declared in an ancestor scope, so not in this list
        let elsewhere = f.fresh_id();

        let mut cache = ScopeCache::new(f.fresh_id());
        cache.require(&[prereq(elsewhere)]);
        let hoisted = f.single_decl(VarKind::Let, "query_1", None);
        let hoisted_id = hoisted.id;
        cache.outer_result(hoisted);

        let out = cache.flush(vec![body_stmt], &mut f);
        assert_eq!(out[0].id, hoisted_id);
    }

    #[test]
    fn inner_results_replace_their_marker_in_nested_blocks() {
        let mut f = NodeFactory::new();
        let mut cache = ScopeCache::new(f.fresh_id());

        let update = f.empty();
        let update_id = update.id;
        let marker = cache
            .inner_result(vec![update], &mut f)
            .expect("first inner result creates the marker");

        let cond = f.bool(true);
        let brk = f.break_stmt();
        let block = f.block(vec![marker, brk]);
        let nested = f.if_stmt(cond, block, None);
        let out = cache.flush(vec![nested], &mut f);

        let StmtKind::If { then_branch, .. } = &out[0].kind else {
            panic!("expected if");
        };
        let StmtKind::Block(stmts) = &then_branch.kind else {
            panic!("expected block");
        };
        assert_eq!(stmts[0].id, update_id);
        assert!(matches!(stmts[1].kind, StmtKind::Break));
    }

    #[test]
    fn conditioned_is_idempotent_and_guards_inner_results() {
        let mut f = NodeFactory::new();
        let mut cache = ScopeCache::new(f.fresh_id());

        let owner = f.ident("world");
        let marker = cache.conditioned(&owner, &mut f);
        assert!(marker.is_some());
        assert!(cache.conditioned(&owner, &mut f).is_none());

        let assign = f.empty();
        assert!(cache.inner_result(vec![assign], &mut f).is_none());

        let out = cache.flush(vec![marker.expect("marker")], &mut f);
        // owner slot declaration, then the guard
        assert_eq!(out.len(), 2);
        let StmtKind::If { cond, then_branch, .. } = &out[1].kind else {
            panic!("expected guard");
        };
        assert!(matches!(cond.kind, ExprKind::Binary { .. }));
        let StmtKind::Block(inner) = &then_branch.kind else {
            panic!("expected block");
        };
        // slot update then the registered inner statement
        assert_eq!(inner.len(), 2);
    }
}
