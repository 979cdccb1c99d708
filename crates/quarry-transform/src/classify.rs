// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Static expression classification.
//!
//! An expression is static when its value is fully determined by
//! declarations reachable without runtime branching. The classifier
//! returns the ordered set of statements that introduce those
//! declarations, so caching code can be hoisted after the last of
//! them.

use indexmap::IndexSet;
use quarry_ast::expr::{Expr, ExprKind};
use quarry_ast::NodeId;
use quarry_oracle::{Container, DeclSite, Oracle};

/// A statement that must exist before hoisted cache code can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Prerequisite {
    pub statement: NodeId,
    /// Whether the statement sits at the top level of the unit.
    pub top_level: bool,
}

/// Outcome of classifying one expression.
#[derive(Debug, Clone)]
pub(crate) enum Staticness {
    /// Static, with the transitive prerequisites in first-seen order.
    Static(Vec<Prerequisite>),
    /// Dynamic; carries the first offending subexpression for
    /// diagnostics.
    Dynamic(Expr),
}

pub(crate) struct Classifier<'a> {
    pub oracle: &'a dyn Oracle,
    /// Function bodies enclosing the current traversal position,
    /// outermost first. The top level is always active.
    pub containers: &'a [NodeId],
}

impl Classifier<'_> {
    pub fn classify(&self, expr: &Expr) -> Staticness {
        let mut prereqs = IndexSet::new();
        match self.visit(expr, &mut prereqs, false) {
            None => Staticness::Static(prereqs.into_iter().collect()),
            Some(offender) => Staticness::Dynamic(offender),
        }
    }

    /// Returns the first offending subexpression, if any. In argument
    /// position (`as_argument`), nested calls are rejected outright.
    fn visit(
        &self,
        expr: &Expr,
        prereqs: &mut IndexSet<Prerequisite>,
        as_argument: bool,
    ) -> Option<Expr> {
        match &expr.kind {
            ExprKind::Ident(_) => self.check_name(expr, prereqs),
            ExprKind::Member {
                object,
                private_name,
                ..
            } => {
                if *private_name {
                    return Some(expr.clone());
                }
                if let Some(offender) = self.visit(object, prereqs, false) {
                    return Some(offender);
                }
                self.check_member(expr, prereqs)
            }
            ExprKind::Call { callee, args } => {
                if as_argument {
                    return Some(expr.clone());
                }
                if let Some(offender) = self.visit(callee, prereqs, false) {
                    return Some(offender);
                }
                for arg in args {
                    if let Some(offender) = self.visit(arg, prereqs, true) {
                        return Some(offender);
                    }
                }
                None
            }
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Undefined => {
                None
            }
            _ => Some(expr.clone()),
        }
    }

    /// Bare names must resolve to a single, initialized, non-parameter
    /// declaration sitting directly in an active caching-scope block.
    fn check_name(&self, expr: &Expr, prereqs: &mut IndexSet<Prerequisite>) -> Option<Expr> {
        let Some(symbol) = self.oracle.symbol_at(expr.id) else {
            return Some(expr.clone());
        };
        let Some(site) = self.oracle.declaration_of(symbol) else {
            return Some(expr.clone());
        };
        self.check_site(expr, &site, prereqs)
    }

    /// A member the oracle cannot place contributes nothing; one it
    /// can place must pass the same rules as a bare name.
    fn check_member(&self, expr: &Expr, prereqs: &mut IndexSet<Prerequisite>) -> Option<Expr> {
        let Some(symbol) = self.oracle.symbol_at(expr.id) else {
            return None;
        };
        let Some(site) = self.oracle.declaration_of(symbol) else {
            return None;
        };
        self.check_site(expr, &site, prereqs)
    }

    fn check_site(
        &self,
        expr: &Expr,
        site: &DeclSite,
        prereqs: &mut IndexSet<Prerequisite>,
    ) -> Option<Expr> {
        if site.is_parameter || !site.has_initializer || !site.direct {
            return Some(expr.clone());
        }
        let top_level = match site.container {
            Container::TopLevel => true,
            Container::Function(id) => {
                if !self.containers.contains(&id) {
                    return Some(expr.clone());
                }
                false
            }
        };
        prereqs.insert(Prerequisite {
            statement: site.statement,
            top_level,
        });
        None
    }
}
