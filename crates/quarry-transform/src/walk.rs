// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Depth-first tree walker and per-unit transformer state.
//!
//! The walker opens a scope cache at every caching-scope boundary
//! (unit root, function body, arrow body), dispatches call expressions
//! to the query cache rewriter and `for-of` statements to the loop
//! inliner, and captures prerequisite statements so they splice in
//! immediately before the statement that demanded them. Hoisted
//! declarations flush when their scope closes, after every statement's
//! final position is known.

use std::collections::{HashMap, HashSet};

use quarry_ast::expr::{Expr, ExprKind};
use quarry_ast::stmt::{Declarator, FnDecl, Stmt, StmtKind, SwitchCase};
use quarry_ast::{NodeFactory, NodeId, SourceFile};
use quarry_oracle::Oracle;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ConfigError;
use crate::scope::ScopeCache;
use crate::wellknown::{self, WellKnown};

/// One successfully cached query, consulted by the loop inliner.
#[derive(Debug, Clone)]
pub(crate) struct CachedBinding {
    /// Identifier bound to the precomputed partition list.
    pub archetypes: String,
    /// Ordered component expressions; order matches destructuring
    /// position.
    pub components: Vec<Expr>,
}

/// Transforms the compilation unit's files, one at a time. All mutable
/// state lives here for exactly one unit's lifetime.
pub struct Transformer<'a> {
    pub(crate) oracle: &'a dyn Oracle,
    config: &'a Config,
    pub(crate) factory: NodeFactory,
    pub(crate) diagnostics: Diagnostics,
    well_known: Option<WellKnown>,
    pub(crate) caches: Vec<ScopeCache>,
    prereqs: Vec<Vec<Stmt>>,
    pub(crate) containers: Vec<NodeId>,
    /// Rewriter-introduced identifier node → its cached binding.
    pub(crate) cached: HashMap<NodeId, CachedBinding>,
    /// Construct calls the author materialized with an explicit
    /// `cached()`; honored as-is.
    pub(crate) manually_cached: HashSet<NodeId>,
    /// Construct calls already rejected, so one site warns at most
    /// once.
    pub(crate) complicated: HashSet<NodeId>,
}

impl<'a> Transformer<'a> {
    pub fn new(oracle: &'a dyn Oracle, config: &'a Config) -> Self {
        Self {
            oracle,
            config,
            factory: NodeFactory::synthesizer(),
            diagnostics: Diagnostics::new(config.silent),
            well_known: None,
            caches: Vec::new(),
            prereqs: Vec::new(),
            containers: Vec::new(),
            cached: HashMap::new(),
            manually_cached: HashSet::new(),
            complicated: HashSet::new(),
        }
    }

    /// Transform one file of the unit. Well-known symbol resolution
    /// happens on the first file and is reused afterwards.
    pub fn transform_file(&mut self, file: SourceFile) -> Result<SourceFile, ConfigError> {
        if self.well_known.is_none() {
            self.well_known = Some(wellknown::resolve(self.oracle, self.config)?);
        }
        let id = file.id;
        let statements = self.scoped(id, None, file.statements);
        Ok(SourceFile { id, statements })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub(crate) fn wk(&self) -> WellKnown {
        *self
            .well_known
            .as_ref()
            .expect("well-known symbols resolved before traversal")
    }

    /// Run a statement list under its own scope cache, flushing
    /// hoisted declarations when it closes.
    pub(crate) fn scoped(
        &mut self,
        scope: NodeId,
        container: Option<NodeId>,
        stmts: Vec<Stmt>,
    ) -> Vec<Stmt> {
        if let Some(c) = container {
            self.containers.push(c);
        }
        self.caches.push(ScopeCache::new(scope));
        let out = self.transform_stmts(stmts);
        let cache = self.caches.pop().expect("scope cache stack is LIFO");
        if container.is_some() {
            self.containers.pop();
        }
        cache.flush(out, &mut self.factory)
    }

    pub(crate) fn transform_stmts(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.transform_stmt(stmt));
        }
        out
    }

    /// Transform one statement, capturing the prerequisites it demands
    /// so they splice in right before it.
    fn transform_stmt(&mut self, stmt: Stmt) -> Vec<Stmt> {
        self.prereqs.push(Vec::new());
        let transformed = self.transform_stmt_inner(stmt);
        let mut result = self.prereqs.pop().expect("prereq frame stack is LIFO");
        result.extend(transformed);
        result
    }

    /// File a prerequisite statement at the current traversal position.
    pub(crate) fn push_prereq(&mut self, stmt: Stmt) {
        if let Some(frame) = self.prereqs.last_mut() {
            frame.push(stmt);
        }
    }

    fn transform_stmt_inner(&mut self, stmt: Stmt) -> Vec<Stmt> {
        let Stmt { id, kind } = stmt;
        match kind {
            StmtKind::Expr(expr) => vec![Stmt {
                id,
                kind: StmtKind::Expr(self.transform_expr(expr)),
            }],
            StmtKind::VarDecl { kind, decls } => {
                let decls = decls
                    .into_iter()
                    .map(|d| Declarator {
                        name: d.name,
                        init: d.init.map(|e| self.transform_expr(e)),
                    })
                    .collect();
                vec![Stmt {
                    id,
                    kind: StmtKind::VarDecl { kind, decls },
                }]
            }
            StmtKind::ForOf {
                decl_kind,
                pattern,
                source,
                body,
            } => self.inline_for_of(id, decl_kind, pattern, source, *body),
            StmtKind::ForRange { var, from, to, body } => {
                let from = self.transform_expr(from);
                let to = self.transform_expr(to);
                let body = Box::new(self.transform_body(*body));
                vec![Stmt {
                    id,
                    kind: StmtKind::ForRange { var, from, to, body },
                }]
            }
            StmtKind::While { cond, body } => {
                let cond = self.transform_expr(cond);
                let body = Box::new(self.transform_body(*body));
                vec![Stmt {
                    id,
                    kind: StmtKind::While { cond, body },
                }]
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.transform_expr(cond);
                let then_branch = Box::new(self.transform_body(*then_branch));
                let else_branch = else_branch.map(|e| Box::new(self.transform_body(*e)));
                vec![Stmt {
                    id,
                    kind: StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                }]
            }
            StmtKind::Block(stmts) => vec![Stmt {
                id,
                kind: StmtKind::Block(self.transform_stmts(stmts)),
            }],
            StmtKind::Return(value) => vec![Stmt {
                id,
                kind: StmtKind::Return(value.map(|v| self.transform_expr(v))),
            }],
            StmtKind::Switch { scrutinee, cases } => {
                let scrutinee = self.transform_expr(scrutinee);
                let cases = cases
                    .into_iter()
                    .map(|case| SwitchCase {
                        test: case.test.map(|t| self.transform_expr(t)),
                        body: self.transform_stmts(case.body),
                    })
                    .collect();
                vec![Stmt {
                    id,
                    kind: StmtKind::Switch { scrutinee, cases },
                }]
            }
            StmtKind::Function(f) => {
                let body = self.scoped(id, Some(id), f.body);
                vec![Stmt {
                    id,
                    kind: StmtKind::Function(FnDecl {
                        name: f.name,
                        params: f.params,
                        body,
                    }),
                }]
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Import { .. } | StmtKind::Empty => {
                vec![Stmt { id, kind }]
            }
        }
    }

    /// Transform a loop/branch body. A single statement that picks up
    /// prerequisites becomes a block so they stay inside the body.
    pub(crate) fn transform_body(&mut self, body: Stmt) -> Stmt {
        match body.kind {
            StmtKind::Block(stmts) => Stmt {
                id: body.id,
                kind: StmtKind::Block(self.transform_stmts(stmts)),
            },
            _ => {
                let mut out = self.transform_stmt(body);
                if out.len() == 1 {
                    out.swap_remove(0)
                } else {
                    self.factory.block(out)
                }
            }
        }
    }

    pub(crate) fn transform_expr(&mut self, expr: Expr) -> Expr {
        match expr.kind {
            ExprKind::Call { .. } => self.transform_call(expr),
            ExprKind::Arrow { params, body } => {
                let body = self.scoped(expr.id, Some(expr.id), body);
                Expr {
                    id: expr.id,
                    kind: ExprKind::Arrow { params, body },
                    trivia: expr.trivia,
                }
            }
            _ => self.walk_expr_children(expr),
        }
    }

    /// Generic structural recursion over an expression's children.
    pub(crate) fn walk_expr_children(&mut self, expr: Expr) -> Expr {
        let Expr { id, kind, trivia } = expr;
        let kind = match kind {
            ExprKind::Member {
                object,
                property,
                private_name,
            } => ExprKind::Member {
                object: Box::new(self.transform_expr(*object)),
                property,
                private_name,
            },
            ExprKind::Index { object, index } => ExprKind::Index {
                object: Box::new(self.transform_expr(*object)),
                index: Box::new(self.transform_expr(*index)),
            },
            ExprKind::Call { callee, args } => ExprKind::Call {
                callee: Box::new(self.transform_expr(*callee)),
                args: args.into_iter().map(|a| self.transform_expr(a)).collect(),
            },
            ExprKind::Arrow { params, body } => {
                let body = self.scoped(id, Some(id), body);
                ExprKind::Arrow { params, body }
            }
            ExprKind::Assign { target, value } => ExprKind::Assign {
                target: Box::new(self.transform_expr(*target)),
                value: Box::new(self.transform_expr(*value)),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op,
                left: Box::new(self.transform_expr(*left)),
                right: Box::new(self.transform_expr(*right)),
            },
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => ExprKind::Ternary {
                cond: Box::new(self.transform_expr(*cond)),
                then: Box::new(self.transform_expr(*then)),
                otherwise: Box::new(self.transform_expr(*otherwise)),
            },
            ExprKind::Spread(inner) => ExprKind::Spread(Box::new(self.transform_expr(*inner))),
            ExprKind::Array(items) => {
                ExprKind::Array(items.into_iter().map(|i| self.transform_expr(i)).collect())
            }
            leaf @ (ExprKind::Ident(_)
            | ExprKind::Number(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::Undefined) => leaf,
        };
        Expr { id, kind, trivia }
    }
}
