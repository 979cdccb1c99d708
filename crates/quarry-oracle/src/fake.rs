// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Hand-built oracle for tests.
//!
//! [`FakeOracle`] resolves a unit the way a host checker would, from
//! two ingredients: a set of pre-registered library symbols (module
//! exports, type member tables, call return types) and a single
//! binding pass over the tree ([`FakeOracle::bind_unit`]) that walks
//! lexical scopes, links identifier and member nodes to symbols, and
//! propagates declared types through calls and member accesses.

use std::collections::HashMap;

use quarry_ast::expr::{BindingName, Expr, ExprKind};
use quarry_ast::stmt::{Stmt, StmtKind};
use quarry_ast::{NodeId, SourceFile};

use crate::{Container, DeclSite, Oracle, SymbolId, TypeRef};

#[derive(Debug, Default)]
pub struct FakeOracle {
    names: Vec<String>,
    decl_keys: Vec<u32>,
    bindings: HashMap<NodeId, SymbolId>,
    decls: HashMap<SymbolId, DeclSite>,
    call_targets: HashMap<NodeId, SymbolId>,
    node_types: HashMap<NodeId, SymbolId>,
    exports: HashMap<String, Vec<(String, SymbolId)>>,
    type_props: HashMap<SymbolId, HashMap<String, SymbolId>>,
    method_returns: HashMap<SymbolId, SymbolId>,
    value_types: HashMap<SymbolId, SymbolId>,
    initializers: HashMap<SymbolId, Expr>,
    type_hints: HashMap<String, SymbolId>,
}

impl FakeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol with its own declaration site.
    pub fn define(&mut self, name: &str) -> SymbolId {
        let id = SymbolId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.decl_keys.push(id.0);
        id
    }

    /// A distinct symbol sharing `of`'s declaration site, the way a
    /// host reports fresh wrappers for generic instantiations.
    pub fn wrapper_of(&mut self, of: SymbolId) -> SymbolId {
        let id = SymbolId(self.names.len() as u32);
        self.names.push(self.names[of.0 as usize].clone());
        self.decl_keys.push(self.decl_keys[of.0 as usize]);
        id
    }

    pub fn export(&mut self, module: &str, name: &str, symbol: SymbolId) {
        self.exports
            .entry(module.to_string())
            .or_default()
            .push((name.to_string(), symbol));
    }

    /// Attach a member symbol to a declared type.
    pub fn set_type_property(&mut self, ty: SymbolId, name: &str, member: SymbolId) {
        self.type_props
            .entry(ty)
            .or_default()
            .insert(name.to_string(), member);
    }

    /// Calls targeting `method` return a value aliased to `ty`.
    pub fn set_method_return(&mut self, method: SymbolId, ty: SymbolId) {
        self.method_returns.insert(method, ty);
    }

    /// Declare a value symbol's type alias.
    pub fn set_value_type(&mut self, value: SymbolId, ty: SymbolId) {
        self.value_types.insert(value, ty);
    }

    /// During binding, a freshly created symbol with this name gets
    /// this type alias. Covers bindings whose type the fake cannot
    /// infer structurally (parameters, destructured properties).
    pub fn hint_value_type(&mut self, name: &str, ty: SymbolId) {
        self.type_hints.insert(name.to_string(), ty);
    }

    /// Override the symbol bound at a node. Tests use this to stand in
    /// wrapper symbols and exercise the `same_declaration` contract.
    pub fn rebind(&mut self, node: NodeId, symbol: SymbolId) {
        self.bindings.insert(node, symbol);
    }

    /// Bind a whole file: resolve identifiers through lexical scopes,
    /// link member accesses through type member tables, and record
    /// call targets and inferred types.
    pub fn bind_unit(&mut self, file: &SourceFile) {
        let mut binder = Binder {
            oracle: self,
            frames: vec![Frame::new()],
            container: Container::TopLevel,
        };
        binder.bind_stmts(&file.statements, true);
    }
}

impl Oracle for FakeOracle {
    fn symbol_at(&self, node: NodeId) -> Option<SymbolId> {
        self.bindings.get(&node).copied()
    }

    fn declaration_of(&self, symbol: SymbolId) -> Option<DeclSite> {
        self.decls.get(&symbol).cloned()
    }

    fn resolved_call_target(&self, call: NodeId) -> Option<SymbolId> {
        self.call_targets.get(&call).copied()
    }

    fn inferred_return_type(&self, call: NodeId) -> Option<TypeRef> {
        self.call_targets.get(&call).map(|target| TypeRef {
            alias: self.method_returns.get(target).copied(),
        })
    }

    fn type_of(&self, node: NodeId) -> Option<TypeRef> {
        self.node_types.get(&node).map(|&alias| TypeRef {
            alias: Some(alias),
        })
    }

    fn exports_of(&self, module: &str) -> Option<Vec<(String, SymbolId)>> {
        self.exports.get(module).cloned()
    }

    fn declared_type_property(&self, type_symbol: SymbolId, name: &str) -> Option<SymbolId> {
        self.type_props.get(&type_symbol)?.get(name).copied()
    }

    fn var_initializer(&self, symbol: SymbolId) -> Option<&Expr> {
        self.initializers.get(&symbol)
    }

    fn same_declaration(&self, a: SymbolId, b: SymbolId) -> bool {
        match (
            self.decl_keys.get(a.0 as usize),
            self.decl_keys.get(b.0 as usize),
        ) {
            (Some(ka), Some(kb)) => ka == kb,
            _ => a == b,
        }
    }
}

struct Frame {
    bindings: HashMap<String, SymbolId>,
}

impl Frame {
    fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

struct Binder<'a> {
    oracle: &'a mut FakeOracle,
    frames: Vec<Frame>,
    container: Container,
}

impl Binder<'_> {
    fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.bindings.get(name).copied())
    }

    fn insert(&mut self, name: &str, sym: SymbolId) {
        self.frames
            .last_mut()
            .expect("binder frame stack never empty")
            .bindings
            .insert(name.to_string(), sym);
    }

    /// Create (or adopt) a symbol for a freshly declared name.
    fn declare(&mut self, name: &str, statement: NodeId, direct: bool, has_initializer: bool) -> SymbolId {
        let sym = self.oracle.define(name);
        self.oracle.decls.insert(
            sym,
            DeclSite {
                statement,
                container: self.container,
                direct,
                is_parameter: false,
                has_initializer,
            },
        );
        if let Some(&ty) = self.oracle.type_hints.get(name) {
            self.oracle.value_types.insert(sym, ty);
        }
        self.insert(name, sym);
        sym
    }

    fn declare_param(&mut self, name: &str, owner: NodeId) {
        let sym = self.oracle.define(name);
        self.oracle.decls.insert(
            sym,
            DeclSite {
                statement: owner,
                container: self.container,
                direct: false,
                is_parameter: true,
                has_initializer: false,
            },
        );
        if let Some(&ty) = self.oracle.type_hints.get(name) {
            self.oracle.value_types.insert(sym, ty);
        }
        self.insert(name, sym);
    }

    fn bind_params(&mut self, params: &[BindingName], owner: NodeId) {
        for param in params {
            match param {
                BindingName::Ident(name) => self.declare_param(name, owner),
                BindingName::Object(names) => {
                    for name in names {
                        self.declare_param(name, owner);
                    }
                }
                BindingName::Array(elems) => {
                    for elem in elems {
                        if let quarry_ast::expr::ArrayBindingElem::Ident(name) = elem {
                            self.declare_param(name, owner);
                        }
                    }
                }
            }
        }
    }

    fn bind_stmts(&mut self, stmts: &[Stmt], direct: bool) {
        for stmt in stmts {
            self.bind_stmt(stmt, direct);
        }
    }

    /// Bind an expression whose inferred type nobody needs.
    fn visit(&mut self, expr: &Expr) {
        let _ = self.bind_expr(expr);
    }

    fn bind_stmt(&mut self, stmt: &Stmt, direct: bool) {
        match &stmt.kind {
            StmtKind::Import { names, module } => {
                for name in names {
                    // Imports adopt the exported symbol so its type
                    // information carries over; the local declaration
                    // site is the import statement itself.
                    let exported = self
                        .oracle
                        .exports
                        .get(module.as_str())
                        .and_then(|list| list.iter().find(|(n, _)| n == name).map(|(_, s)| *s));
                    let sym = match exported {
                        Some(sym) => {
                            self.insert(name, sym);
                            sym
                        }
                        None => self.declare(name, stmt.id, direct, true),
                    };
                    self.oracle.decls.insert(
                        sym,
                        DeclSite {
                            statement: stmt.id,
                            container: self.container,
                            direct,
                            is_parameter: false,
                            has_initializer: true,
                        },
                    );
                }
            }
            StmtKind::VarDecl { decls, .. } => {
                for decl in decls {
                    let init_ty = decl.init.as_ref().and_then(|e| self.bind_expr(e));
                    match &decl.name {
                        BindingName::Ident(name) => {
                            let sym = self.declare(name, stmt.id, direct, decl.init.is_some());
                            if let Some(init) = &decl.init {
                                self.oracle.initializers.insert(sym, init.clone());
                                if let Some(ty) = init_ty {
                                    self.oracle.value_types.insert(sym, ty);
                                }
                            }
                        }
                        BindingName::Object(names) => {
                            for name in names {
                                self.declare(name, stmt.id, direct, decl.init.is_some());
                            }
                        }
                        BindingName::Array(elems) => {
                            for elem in elems {
                                if let quarry_ast::expr::ArrayBindingElem::Ident(name) = elem {
                                    self.declare(name, stmt.id, direct, decl.init.is_some());
                                }
                            }
                        }
                    }
                }
            }
            StmtKind::Function(f) => {
                self.declare(&f.name, stmt.id, direct, true);
                let outer = std::mem::replace(&mut self.container, Container::Function(stmt.id));
                self.frames.push(Frame::new());
                self.bind_params(&f.params, stmt.id);
                self.bind_stmts(&f.body, true);
                self.frames.pop();
                self.container = outer;
            }
            StmtKind::ForOf {
                pattern, source, body, ..
            } => {
                self.visit(source);
                self.frames.push(Frame::new());
                match pattern {
                    BindingName::Ident(name) => {
                        self.declare(name, stmt.id, false, false);
                    }
                    BindingName::Array(elems) => {
                        for elem in elems {
                            if let quarry_ast::expr::ArrayBindingElem::Ident(name) = elem {
                                self.declare(name, stmt.id, false, false);
                            }
                        }
                    }
                    BindingName::Object(names) => {
                        for name in names {
                            self.declare(name, stmt.id, false, false);
                        }
                    }
                }
                self.bind_stmt(body, false);
                self.frames.pop();
            }
            StmtKind::ForRange { var, from, to, body } => {
                self.visit(from);
                self.visit(to);
                self.frames.push(Frame::new());
                self.declare(var, stmt.id, false, false);
                self.bind_stmt(body, false);
                self.frames.pop();
            }
            StmtKind::While { cond, body } => {
                self.visit(cond);
                self.bind_stmt(body, false);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond);
                self.bind_stmt(then_branch, false);
                if let Some(e) = else_branch {
                    self.bind_stmt(e, false);
                }
            }
            StmtKind::Block(stmts) => {
                self.frames.push(Frame::new());
                self.bind_stmts(stmts, false);
                self.frames.pop();
            }
            StmtKind::Switch { scrutinee, cases } => {
                self.visit(scrutinee);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.visit(test);
                    }
                    self.bind_stmts(&case.body, false);
                }
            }
            StmtKind::Expr(expr) => {
                self.visit(expr);
            }
            StmtKind::Return(value) => {
                if let Some(v) = value {
                    self.visit(v);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    /// Bind an expression, returning its inferred type alias.
    fn bind_expr(&mut self, expr: &Expr) -> Option<SymbolId> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let sym = self.lookup(name)?;
                self.oracle.bindings.insert(expr.id, sym);
                let ty = self.oracle.value_types.get(&sym).copied();
                if let Some(ty) = ty {
                    self.oracle.node_types.insert(expr.id, ty);
                }
                ty
            }
            ExprKind::Member {
                object, property, ..
            } => {
                let obj_ty = self.bind_expr(object)?;
                let prop = self
                    .oracle
                    .type_props
                    .get(&obj_ty)
                    .and_then(|props| props.get(property))
                    .copied()?;
                self.oracle.bindings.insert(expr.id, prop);
                let ty = self.oracle.value_types.get(&prop).copied();
                if let Some(ty) = ty {
                    self.oracle.node_types.insert(expr.id, ty);
                }
                ty
            }
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.visit(arg);
                }
                self.visit(callee);
                let target = self.oracle.bindings.get(&callee.id).copied()?;
                self.oracle.call_targets.insert(expr.id, target);
                let ret = self.oracle.method_returns.get(&target).copied();
                if let Some(ret) = ret {
                    self.oracle.node_types.insert(expr.id, ret);
                }
                ret
            }
            ExprKind::Arrow { params, body } => {
                let outer = std::mem::replace(&mut self.container, Container::Function(expr.id));
                self.frames.push(Frame::new());
                self.bind_params(params, expr.id);
                self.bind_stmts(body, true);
                self.frames.pop();
                self.container = outer;
                None
            }
            ExprKind::Assign { target, value } => {
                self.visit(target);
                self.visit(value);
                None
            }
            ExprKind::Binary { left, right, .. } => {
                self.visit(left);
                self.visit(right);
                None
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.visit(cond);
                self.visit(then);
                self.visit(otherwise);
                None
            }
            ExprKind::Index { object, index } => {
                self.visit(object);
                self.visit(index);
                None
            }
            ExprKind::Spread(inner) => {
                self.visit(inner);
                None
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.visit(item);
                }
                None
            }
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Undefined => None,
        }
    }
}
