// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Query cache rewriting.
//!
//! Replaces a provably-static query construction with a reference to a
//! hoisted cached query. Stable owners get a fully initialized
//! `const` pair at scope entry; dynamic owners get uninitialized
//! slots plus an owner-identity guard that rebuilds the cache exactly
//! once per distinct owner value.

use quarry_ast::expr::{BindingName, Expr, ExprKind};
use quarry_ast::stmt::{Declarator, VarKind};
use quarry_ast::NodeId;
use quarry_print::expr_text;

use crate::classify::{Classifier, Staticness};
use crate::descriptor::parse_query;
use crate::walk::{CachedBinding, Transformer};
use crate::wellknown::WellKnown;

/// The located construct call plus its owner expression, when the
/// callee has the supported `<owner>.query` shape.
struct ConstructSite {
    construct: NodeId,
    owner: Option<Expr>,
}

impl Transformer<'_> {
    /// Rewriter entry point for call expressions. Falls back to a
    /// plain child walk when the site is not cacheable.
    pub(crate) fn transform_call(&mut self, call: Expr) -> Expr {
        match self.rewrite_query(call) {
            Ok(replacement) => replacement,
            Err(original) => self.walk_expr_children(original),
        }
    }

    fn rewrite_query(&mut self, call: Expr) -> Result<Expr, Expr> {
        if call.has_marker("no-cache") {
            return Err(call);
        }
        if self.oracle.resolved_call_target(call.id).is_none() {
            return Err(call);
        }
        let Some(ret) = self.oracle.inferred_return_type(call.id) else {
            return Err(call);
        };
        let Some(alias) = ret.alias else {
            return Err(call);
        };
        let wk = self.wk();

        // An explicit materialize call in the chain means the author
        // already cached this query; remember its construct so the
        // walker leaves it alone on descent.
        if self.oracle.same_declaration(alias, wk.cached_query_type) {
            if let Some(construct) = self.manual_cache_construct(&call, &wk) {
                self.manually_cached.insert(construct);
            }
            return Err(call);
        }
        if !self.oracle.same_declaration(alias, wk.query_type) {
            return Err(call);
        }

        let Some(site) = self.construct_site(&call, &wk) else {
            return Err(call);
        };
        if self.manually_cached.contains(&site.construct)
            || self.complicated.contains(&site.construct)
        {
            return Err(call);
        }

        let classifier = Classifier {
            oracle: self.oracle,
            containers: &self.containers,
        };
        let descriptor = match parse_query(&call, self.oracle, &wk, &classifier) {
            Ok(descriptor) => descriptor,
            Err(fault) => {
                self.complicated.insert(site.construct);
                self.diagnostics.warn(format!(
                    "'{}' isn't simple. Query '{}' will not be cached.",
                    expr_text(&fault.offending),
                    expr_text(&call),
                ));
                return Err(call);
            }
        };

        let Some(owner) = site.owner else {
            self.diagnostics.warn(format!(
                "unsupported query access in '{}'. Query will not be cached.",
                expr_text(&call),
            ));
            return Err(call);
        };

        // A top-level-stable owner caches file-wide; anything else in
        // the innermost scope. Owners that fail classification have no
        // hoistable declarations and need the invalidation guard.
        let (owner_prereqs, dynamic_owner) = match classifier.classify(&owner) {
            Staticness::Static(prereqs) => (prereqs, false),
            Staticness::Dynamic(_) => (Vec::new(), true),
        };
        let file_wide = !dynamic_owner && owner_prereqs.iter().any(|p| p.top_level);

        let query_name = self.factory.unique_name("query");
        let archetypes_name = self.factory.unique_name("archetypes");
        let cached_call = self.factory.method_call(call, "cached", vec![]);
        let query_ref = self.factory.ident(query_name.clone());
        let archetypes_read = self.factory.method_call(query_ref, "archetypes", vec![]);

        let cache_index = if file_wide { 0 } else { self.caches.len() - 1 };
        if dynamic_owner {
            let decl = self.factory.var_decl(
                VarKind::Let,
                vec![
                    Declarator {
                        name: BindingName::Ident(query_name.clone()),
                        init: None,
                    },
                    Declarator {
                        name: BindingName::Ident(archetypes_name.clone()),
                        init: None,
                    },
                ],
            );
            let query_target = self.factory.ident(query_name.clone());
            let assign_query = self.factory.assign(query_target, cached_call);
            let archetypes_target = self.factory.ident(archetypes_name.clone());
            let assign_archetypes = self.factory.assign(archetypes_target, archetypes_read);
            let update_query = self.factory.expr_stmt(assign_query);
            let update_archetypes = self.factory.expr_stmt(assign_archetypes);

            let cache = &mut self.caches[cache_index];
            cache.require(&descriptor.prereqs);
            cache.outer_result(decl);
            let guard_marker = cache.conditioned(&owner, &mut self.factory);
            let update_marker =
                cache.inner_result(vec![update_query, update_archetypes], &mut self.factory);
            if let Some(marker) = guard_marker {
                self.push_prereq(marker);
            }
            if let Some(marker) = update_marker {
                self.push_prereq(marker);
            }
        } else {
            let decl = self.factory.var_decl(
                VarKind::Const,
                vec![
                    Declarator {
                        name: BindingName::Ident(query_name.clone()),
                        init: Some(cached_call),
                    },
                    Declarator {
                        name: BindingName::Ident(archetypes_name.clone()),
                        init: Some(archetypes_read),
                    },
                ],
            );
            let cache = &mut self.caches[cache_index];
            cache.require(&owner_prereqs);
            cache.require(&descriptor.prereqs);
            cache.outer_result(decl);
        }

        let replacement = self.factory.ident(query_name);
        self.cached.insert(
            replacement.id,
            CachedBinding {
                archetypes: archetypes_name,
                components: descriptor.components,
            },
        );
        Ok(replacement)
    }

    pub(crate) fn is_query_construction(&self, expr: &Expr, wk: &WellKnown) -> bool {
        if let ExprKind::Call { callee, .. } = &expr.kind {
            if let Some(symbol) = self.oracle.symbol_at(callee.id) {
                return self.oracle.same_declaration(symbol, wk.query_method);
            }
        }
        false
    }

    /// The construct call for this expression: the expression itself,
    /// or the first matching descendant.
    fn construct_site(&self, call: &Expr, wk: &WellKnown) -> Option<ConstructSite> {
        let predicate = |e: &Expr| self.is_query_construction(e, wk);
        let construct = if predicate(call) {
            call
        } else {
            find_matching_child(call, &predicate)?
        };
        let owner = match &construct.kind {
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Member { object, .. } => Some((**object).clone()),
                _ => None,
            },
            _ => None,
        };
        Some(ConstructSite {
            construct: construct.id,
            owner,
        })
    }

    /// Walk the modifier chain inward; when an explicit `cached` link
    /// sits above a construct call, return that construct.
    fn manual_cache_construct(&self, call: &Expr, wk: &WellKnown) -> Option<NodeId> {
        let mut current = call;
        let mut saw_cached = false;
        loop {
            let ExprKind::Call { callee, .. } = &current.kind else {
                return None;
            };
            let ExprKind::Member { object, .. } = &callee.kind else {
                return None;
            };
            let symbol = self.oracle.symbol_at(callee.id)?;
            if self.oracle.same_declaration(symbol, wk.query_method) {
                return saw_cached.then_some(current.id);
            }
            if self.oracle.same_declaration(symbol, wk.cached_method) {
                saw_cached = true;
            } else if !self.oracle.same_declaration(symbol, wk.with_method)
                && !self.oracle.same_declaration(symbol, wk.without_method)
            {
                return None;
            }
            current = object;
        }
    }
}

/// First descendant expression matching the predicate, in document
/// order. Does not cross into arrow bodies; those are walked on their
/// own.
fn find_matching_child<'e>(expr: &'e Expr, predicate: &dyn Fn(&Expr) -> bool) -> Option<&'e Expr> {
    for child in expr_children(expr) {
        if predicate(child) {
            return Some(child);
        }
        if let Some(found) = find_matching_child(child, predicate) {
            return Some(found);
        }
    }
    None
}

fn expr_children(expr: &Expr) -> Vec<&Expr> {
    match &expr.kind {
        ExprKind::Member { object, .. } => vec![object],
        ExprKind::Index { object, index } => vec![object, index],
        ExprKind::Call { callee, args } => {
            let mut children: Vec<&Expr> = vec![callee];
            children.extend(args.iter());
            children
        }
        ExprKind::Assign { target, value } => vec![target, value],
        ExprKind::Binary { left, right, .. } => vec![left, right],
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => vec![cond, then, otherwise],
        ExprKind::Spread(inner) => vec![inner],
        ExprKind::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}
