// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Loop inlining.
//!
//! Rewrites a destructuring `for-of` over a query into two nested
//! loops: an outer loop over the query's partition list and an inner
//! descending index loop over each partition's entity list. Reverse
//! order keeps iteration correct when the body mutates the partition
//! (removals). Anything this pass does not recognize is left entirely
//! untouched; there is never a partial rewrite.

use std::collections::HashSet;

use quarry_ast::expr::{ArrayBindingElem, BindingName, BinOp, Expr, ExprKind};
use quarry_ast::stmt::{Declarator, Stmt, StmtKind, VarKind};
use quarry_ast::NodeId;

use crate::classify::{Classifier, Staticness};
use crate::walk::Transformer;
use crate::wellknown::WellKnown;

/// One component slot of the destructuring pattern. Slots beyond the
/// known component list bind `undefined`.
struct Slot {
    binding: String,
    column: Option<(Expr, String)>,
}

impl Transformer<'_> {
    /// Inliner entry point for `for-of` statements.
    pub(crate) fn inline_for_of(
        &mut self,
        id: NodeId,
        decl_kind: VarKind,
        pattern: BindingName,
        source: Expr,
        body: Stmt,
    ) -> Vec<Stmt> {
        let wk = self.wk();

        let elems = match pattern {
            BindingName::Array(ref elems) => elems.clone(),
            other => return self.rebuild_for_of(id, decl_kind, other, source, body, true),
        };
        if source.has_marker("no-cache") {
            return self.rebuild_for_of(id, decl_kind, pattern, source, body, true);
        }
        let is_call = matches!(source.kind, ExprKind::Call { .. });
        let is_ident = matches!(source.kind, ExprKind::Ident(_));
        if !is_call && !is_ident {
            return self.rebuild_for_of(id, decl_kind, pattern, source, body, true);
        }
        if is_call {
            let query_typed = self
                .oracle
                .inferred_return_type(source.id)
                .and_then(|t| t.alias)
                .is_some_and(|alias| self.is_query_alias(alias, &wk));
            if !query_typed {
                return self.rebuild_for_of(id, decl_kind, pattern, source, body, true);
            }
        }

        // Re-invoke the rewriter on the source; a cacheable query
        // becomes a reference to its cached binding.
        let source = self.transform_expr(source);
        let cached = match &source.kind {
            ExprKind::Ident(_) => self.cached.get(&source.id).cloned(),
            _ => None,
        };
        if cached.is_none() && matches!(source.kind, ExprKind::Ident(_)) {
            let query_typed = self
                .oracle
                .type_of(source.id)
                .and_then(|t| t.alias)
                .is_some_and(|alias| self.is_query_alias(alias, &wk));
            if !query_typed {
                return self.rebuild_for_of(id, decl_kind, pattern, source, body, false);
            }
        }

        let components = match &cached {
            Some(binding) => Some(binding.components.clone()),
            None => self.find_query_components(&source, &mut HashSet::new(), &wk),
        };
        let Some(components) = components else {
            return self.rebuild_for_of(id, decl_kind, pattern, source, body, false);
        };

        let archetypes_expr = match &cached {
            Some(binding) => self.factory.ident(binding.archetypes.clone()),
            None => self.factory.method_call(source, "archetypes", vec![]),
        };

        let archetype = self.factory.unique_name("archetype");
        let entities = self.factory.unique_name("entities");
        let row = self.factory.unique_name("row");

        let (entity_slot, component_slots) = match elems.split_first() {
            Some((entity, rest)) => (Some(entity.clone()), rest.to_vec()),
            None => (None, Vec::new()),
        };
        let mut slots = Vec::new();
        for (i, elem) in component_slots.iter().enumerate() {
            let ArrayBindingElem::Ident(name) = elem else {
                continue;
            };
            let column = components
                .get(i)
                .map(|component| (component.clone(), self.factory.unique_name("column")));
            slots.push(Slot {
                binding: name.clone(),
                column,
            });
        }

        let mut broken = None;
        let body = self.retarget_breaks(body, &mut broken);
        let body = self.transform_body(body);

        // Inner loop: reversed index walk over the entity list.
        let mut inner_stmts = Vec::new();
        if let Some(ArrayBindingElem::Ident(entity_name)) = &entity_slot {
            let list = self.factory.ident(entities.clone());
            let index = self.factory.ident(row.clone());
            let access = self.factory.index(list, index);
            inner_stmts.push(self.factory.var_decl(
                VarKind::Const,
                vec![Declarator {
                    name: BindingName::Ident(entity_name.clone()),
                    init: Some(access),
                }],
            ));
        }
        if !slots.is_empty() {
            let decls = slots
                .iter()
                .map(|slot| {
                    let init = match &slot.column {
                        Some((_, column)) => {
                            let column_ref = self.factory.ident(column.clone());
                            let index = self.factory.ident(row.clone());
                            self.factory.index(column_ref, index)
                        }
                        None => self.factory.undefined(),
                    };
                    Declarator {
                        name: BindingName::Ident(slot.binding.clone()),
                        init: Some(init),
                    }
                })
                .collect();
            inner_stmts.push(self.factory.var_decl(VarKind::Const, decls));
        }
        inner_stmts.push(body);
        let inner_body = self.factory.block(inner_stmts);

        let entities_ref = self.factory.ident(entities.clone());
        let size = self.factory.method_call(entities_ref, "size", vec![]);
        let one = self.factory.number(1.0);
        let from = self.factory.binary(BinOp::Sub, size, one);
        let to = self.factory.number(0.0);
        let inner_loop = self.factory.for_range(row, from, to, inner_body);

        // Outer loop: one iteration per partition.
        let mut outer_stmts = Vec::new();
        let archetype_ref = self.factory.ident(archetype.clone());
        let entities_init = self.factory.member(archetype_ref, "entities");
        outer_stmts.push(self.factory.var_decl(
            VarKind::Const,
            vec![Declarator {
                name: BindingName::Ident(entities.clone()),
                init: Some(entities_init),
            }],
        ));
        if slots.iter().any(|slot| slot.column.is_some()) {
            let field = self.factory.unique_name("field");
            let archetype_ref = self.factory.ident(archetype.clone());
            let field_init = self.factory.member(archetype_ref, "columns_map");
            let mut decls = vec![Declarator {
                name: BindingName::Ident(field.clone()),
                init: Some(field_init),
            }];
            for slot in &slots {
                if let Some((component, column)) = &slot.column {
                    let field_ref = self.factory.ident(field.clone());
                    let access = self.factory.index(field_ref, component.clone());
                    decls.push(Declarator {
                        name: BindingName::Ident(column.clone()),
                        init: Some(access),
                    });
                }
            }
            outer_stmts.push(self.factory.var_decl(VarKind::Const, decls));
        }
        if let Some(flag) = &broken {
            let init = self.factory.bool(false);
            outer_stmts.push(self.factory.single_decl(VarKind::Let, flag.clone(), Some(init)));
        }
        outer_stmts.push(inner_loop);
        if let Some(flag) = &broken {
            let flag_ref = self.factory.ident(flag.clone());
            let brk = self.factory.break_stmt();
            outer_stmts.push(self.factory.if_stmt(flag_ref, brk, None));
        }

        let outer_body = self.factory.block(outer_stmts);
        vec![self.factory.for_of(
            VarKind::Const,
            BindingName::Ident(archetype),
            archetypes_expr,
            outer_body,
        )]
    }

    fn is_query_alias(&self, alias: quarry_oracle::SymbolId, wk: &WellKnown) -> bool {
        self.oracle.same_declaration(alias, wk.query_type)
            || self.oracle.same_declaration(alias, wk.cached_query_type)
    }

    /// Leave the loop structurally untouched; children are still
    /// walked so nested queries keep transforming.
    fn rebuild_for_of(
        &mut self,
        id: NodeId,
        decl_kind: VarKind,
        pattern: BindingName,
        source: Expr,
        body: Stmt,
        transform_source: bool,
    ) -> Vec<Stmt> {
        let source = if transform_source {
            self.transform_expr(source)
        } else {
            source
        };
        let body = Box::new(self.transform_body(body));
        vec![Stmt {
            id,
            kind: StmtKind::ForOf {
                decl_kind,
                pattern,
                source,
                body,
            },
        }]
    }

    /// Recover the ordered component list for a non-cached source by
    /// following filter-modifier chains and local-variable
    /// initializers, never through non-static control flow.
    fn find_query_components(
        &self,
        expr: &Expr,
        visited: &mut HashSet<NodeId>,
        wk: &WellKnown,
    ) -> Option<Vec<Expr>> {
        if !visited.insert(expr.id) {
            return None;
        }
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                let ExprKind::Member { object, .. } = &callee.kind else {
                    return None;
                };
                let symbol = self.oracle.symbol_at(callee.id)?;
                let is_modifier = [wk.with_method, wk.without_method, wk.cached_method]
                    .iter()
                    .any(|m| self.oracle.same_declaration(symbol, *m));
                if is_modifier {
                    return self.find_query_components(object, visited, wk);
                }
                if !self.oracle.same_declaration(symbol, wk.query_method) {
                    return None;
                }
                let classifier = Classifier {
                    oracle: self.oracle,
                    containers: &self.containers,
                };
                let mut components = Vec::new();
                for arg in args {
                    match classifier.classify(arg) {
                        Staticness::Static(_) => components.push(arg.clone()),
                        Staticness::Dynamic(_) => return None,
                    }
                }
                Some(components)
            }
            ExprKind::Ident(_) => {
                let symbol = self.oracle.symbol_at(expr.id)?;
                let init = self.oracle.var_initializer(symbol)?;
                self.find_query_components(init, visited, wk)
            }
            _ => None,
        }
    }

    /// Rewrite breaks belonging to the original loop body into a flag
    /// set plus an inner break. Nested loops and switches own their
    /// break targets and are not entered; neither are nested
    /// functions.
    fn retarget_breaks(&mut self, stmt: Stmt, broken: &mut Option<String>) -> Stmt {
        let Stmt { id, kind } = stmt;
        match kind {
            StmtKind::Break => {
                let flag = match broken {
                    Some(flag) => flag.clone(),
                    None => {
                        let flag = self.factory.unique_name("broken");
                        *broken = Some(flag.clone());
                        flag
                    }
                };
                let flag_ref = self.factory.ident(flag);
                let truth = self.factory.bool(true);
                let assign = self.factory.assign(flag_ref, truth);
                let set_flag = self.factory.expr_stmt(assign);
                let brk = self.factory.break_stmt();
                self.factory.block(vec![set_flag, brk])
            }
            StmtKind::Block(stmts) => Stmt {
                id,
                kind: StmtKind::Block(
                    stmts
                        .into_iter()
                        .map(|s| self.retarget_breaks(s, broken))
                        .collect(),
                ),
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let then_branch = Box::new(self.retarget_breaks(*then_branch, broken));
                let else_branch = else_branch.map(|e| Box::new(self.retarget_breaks(*e, broken)));
                Stmt {
                    id,
                    kind: StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                }
            }
            kind @ (StmtKind::ForOf { .. }
            | StmtKind::ForRange { .. }
            | StmtKind::While { .. }
            | StmtKind::Switch { .. }
            | StmtKind::Function(_)) => Stmt { id, kind },
            other => Stmt { id, kind: other },
        }
    }
}
