// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Query descriptor extraction.
//!
//! Walks a query call chain and classifies every argument passed to
//! the well-known construct/filter operations. Component order is
//! semantically significant: it must match destructuring position in
//! consuming loops.

use indexmap::IndexSet;
use quarry_ast::expr::{Expr, ExprKind};
use quarry_oracle::Oracle;

use crate::classify::{Classifier, Prerequisite, Staticness};
use crate::wellknown::WellKnown;

/// Parsed description of one query construction chain.
#[derive(Debug, Clone)]
pub(crate) struct QueryDescriptor {
    /// Construct-call arguments, in argument order.
    pub components: Vec<Expr>,
    /// All prerequisites across construct and filter arguments,
    /// first-seen order.
    pub prereqs: Vec<Prerequisite>,
}

/// Parse failure: the first non-static argument in traversal order.
#[derive(Debug, Clone)]
pub(crate) struct DescriptorError {
    pub offending: Expr,
    /// Components committed before the fault; diagnostic text only.
    #[allow(dead_code)]
    pub committed: Vec<Expr>,
}

pub(crate) fn parse_query(
    expr: &Expr,
    oracle: &dyn Oracle,
    wk: &WellKnown,
    classifier: &Classifier<'_>,
) -> Result<QueryDescriptor, DescriptorError> {
    let mut walk = Walk {
        oracle,
        wk,
        classifier,
        components: Vec::new(),
        prereqs: IndexSet::new(),
    };
    match walk.visit(expr) {
        Some(offending) => Err(DescriptorError {
            offending,
            committed: walk.components,
        }),
        None => Ok(QueryDescriptor {
            components: walk.components,
            prereqs: walk.prereqs.into_iter().collect(),
        }),
    }
}

struct Walk<'a> {
    oracle: &'a dyn Oracle,
    wk: &'a WellKnown,
    classifier: &'a Classifier<'a>,
    components: Vec<Expr>,
    prereqs: IndexSet<Prerequisite>,
}

impl Walk<'_> {
    /// Pre-order walk; the first fault encountered wins.
    fn visit(&mut self, expr: &Expr) -> Option<Expr> {
        if let ExprKind::Call { callee, args } = &expr.kind {
            if let Some(symbol) = self.oracle.symbol_at(callee.id) {
                let is_construct = self.oracle.same_declaration(symbol, self.wk.query_method);
                let is_filter = self.oracle.same_declaration(symbol, self.wk.with_method)
                    || self.oracle.same_declaration(symbol, self.wk.without_method);
                if is_construct || is_filter {
                    for arg in args {
                        match self.classifier.classify(arg) {
                            Staticness::Static(prereqs) => {
                                self.prereqs.extend(prereqs);
                                if is_construct {
                                    self.components.push(arg.clone());
                                }
                            }
                            Staticness::Dynamic(offending) => return Some(offending),
                        }
                    }
                }
            }
        }
        self.visit_children(expr)
    }

    fn visit_children(&mut self, expr: &Expr) -> Option<Expr> {
        match &expr.kind {
            ExprKind::Call { callee, args } => self
                .visit(callee)
                .or_else(|| args.iter().find_map(|arg| self.visit(arg))),
            ExprKind::Member { object, .. } => self.visit(object),
            ExprKind::Index { object, index } => {
                self.visit(object).or_else(|| self.visit(index))
            }
            ExprKind::Assign { target, value } => {
                self.visit(target).or_else(|| self.visit(value))
            }
            ExprKind::Binary { left, right, .. } => {
                self.visit(left).or_else(|| self.visit(right))
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => self
                .visit(cond)
                .or_else(|| self.visit(then))
                .or_else(|| self.visit(otherwise)),
            ExprKind::Spread(inner) => self.visit(inner),
            ExprKind::Array(items) => items.iter().find_map(|item| self.visit(item)),
            _ => None,
        }
    }
}
