// SPDX-License-Identifier: (MIT OR Apache-2.0)

use quarry_ast::expr::{ArrayBindingElem, BindingName, BinOp, Expr, ExprKind};
use quarry_ast::stmt::{Stmt, StmtKind, VarKind};
use quarry_ast::SourceFile;

pub struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    pub fn finish(mut self) -> String {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        self.out
    }

    pub fn finish_inline(self) -> String {
        self.out
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    pub fn emit_unit(&mut self, file: &SourceFile) {
        for stmt in &file.statements {
            self.emit_stmt(stmt);
        }
    }

    pub fn emit_stmt(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.emit_stmt_content(stmt);
    }

    fn emit_stmt_content(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.emit_expr(e);
                self.out.push_str(";\n");
            }
            StmtKind::VarDecl { kind, decls } => {
                self.out.push_str(var_keyword(*kind));
                for (i, decl) in decls.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_binding(&decl.name);
                    if let Some(init) = &decl.init {
                        self.out.push_str(" = ");
                        self.emit_expr(init);
                    }
                }
                self.out.push_str(";\n");
            }
            StmtKind::ForOf {
                decl_kind,
                pattern,
                source,
                body,
            } => {
                self.out.push_str("for (");
                self.out.push_str(var_keyword(*decl_kind));
                self.emit_binding(pattern);
                self.out.push_str(" of ");
                self.emit_expr(source);
                self.out.push(')');
                self.emit_attached(body);
            }
            StmtKind::ForRange { var, from, to, body } => {
                self.out.push_str("for (let ");
                self.out.push_str(var);
                self.out.push_str(" = ");
                self.emit_expr(from);
                self.out.push_str("; ");
                self.out.push_str(var);
                self.out.push_str(" >= ");
                self.emit_expr(to);
                self.out.push_str("; ");
                self.out.push_str(var);
                self.out.push_str("--)");
                self.emit_attached(body);
            }
            StmtKind::While { cond, body } => {
                self.out.push_str("while (");
                self.emit_expr(cond);
                self.out.push(')');
                self.emit_attached(body);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.out.push_str("if (");
                self.emit_expr(cond);
                self.out.push(')');
                self.emit_attached(then_branch);
                if let Some(else_branch) = else_branch {
                    // re-open the line the then-block closed
                    if self.out.ends_with('\n') {
                        self.out.pop();
                    }
                    self.out.push_str(" else");
                    self.emit_attached(else_branch);
                }
            }
            StmtKind::Block(stmts) => {
                self.emit_braced(stmts);
            }
            StmtKind::Break => self.out.push_str("break;\n"),
            StmtKind::Continue => self.out.push_str("continue;\n"),
            StmtKind::Return(value) => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.emit_expr(value);
                }
                self.out.push_str(";\n");
            }
            StmtKind::Switch { scrutinee, cases } => {
                self.out.push_str("switch (");
                self.emit_expr(scrutinee);
                self.out.push_str(") {\n");
                self.indent += 1;
                for case in cases {
                    self.write_indent();
                    match &case.test {
                        Some(test) => {
                            self.out.push_str("case ");
                            self.emit_expr(test);
                            self.out.push_str(":\n");
                        }
                        None => self.out.push_str("default:\n"),
                    }
                    self.indent += 1;
                    for s in &case.body {
                        self.emit_stmt(s);
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("}\n");
            }
            StmtKind::Function(f) => {
                self.out.push_str("function ");
                self.out.push_str(&f.name);
                self.out.push('(');
                for (i, p) in f.params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_binding(p);
                }
                self.out.push(')');
                self.out.push_str(" {\n");
                self.indent += 1;
                for s in &f.body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("}\n");
            }
            StmtKind::Import { names, module } => {
                self.out.push_str("import { ");
                self.out.push_str(&names.join(", "));
                self.out.push_str(" } from \"");
                self.out.push_str(module);
                self.out.push_str("\";\n");
            }
            StmtKind::Empty => self.out.push_str(";\n"),
        }
    }

    /// Emit a loop/if body: blocks get braces, simple statements stay
    /// on the header line, anything else is wrapped in a block.
    fn emit_attached(&mut self, body: &Stmt) {
        match &body.kind {
            StmtKind::Block(stmts) => {
                self.out.push(' ');
                self.emit_braced(stmts);
            }
            StmtKind::Expr(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Return(_)
            | StmtKind::Empty
            | StmtKind::VarDecl { .. } => {
                self.out.push(' ');
                self.emit_stmt_content(body);
            }
            _ => {
                self.out.push_str(" {\n");
                self.indent += 1;
                self.emit_stmt(body);
                self.indent -= 1;
                self.write_indent();
                self.out.push_str("}\n");
            }
        }
    }

    fn emit_braced(&mut self, stmts: &[Stmt]) {
        self.out.push_str("{\n");
        self.indent += 1;
        for s in stmts {
            self.emit_stmt(s);
        }
        self.indent -= 1;
        self.write_indent();
        self.out.push_str("}\n");
    }

    fn emit_binding(&mut self, binding: &BindingName) {
        match binding {
            BindingName::Ident(name) => self.out.push_str(name),
            BindingName::Array(elems) => {
                self.out.push('[');
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let ArrayBindingElem::Ident(name) = elem {
                        self.out.push_str(name);
                    }
                }
                self.out.push(']');
            }
            BindingName::Object(names) => {
                self.out.push_str("{ ");
                self.out.push_str(&names.join(", "));
                self.out.push_str(" }");
            }
        }
    }

    pub fn emit_expr(&mut self, expr: &Expr) {
        if let Some(trivia) = &expr.trivia {
            self.out.push_str("/* ");
            self.out.push_str(trivia);
            self.out.push_str(" */ ");
        }
        match &expr.kind {
            ExprKind::Ident(name) => self.out.push_str(name),
            ExprKind::Number(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    self.out.push_str(&format!("{}", *value as i64));
                } else {
                    self.out.push_str(&format!("{value}"));
                }
            }
            ExprKind::Str(value) => {
                self.out.push('"');
                self.out.push_str(value);
                self.out.push('"');
            }
            ExprKind::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            ExprKind::Undefined => self.out.push_str("undefined"),
            ExprKind::Member {
                object,
                property,
                private_name,
            } => {
                self.emit_expr(object);
                self.out.push('.');
                if *private_name {
                    self.out.push('#');
                }
                self.out.push_str(property);
            }
            ExprKind::Index { object, index } => {
                self.emit_expr(object);
                self.out.push('[');
                self.emit_expr(index);
                self.out.push(']');
            }
            ExprKind::Call { callee, args } => {
                self.emit_expr(callee);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(arg);
                }
                self.out.push(')');
            }
            ExprKind::Arrow { params, body } => {
                self.out.push('(');
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_binding(p);
                }
                self.out.push_str(") => {\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            ExprKind::Assign { target, value } => {
                self.emit_expr(target);
                self.out.push_str(" = ");
                self.emit_expr(value);
            }
            ExprKind::Binary { op, left, right } => {
                self.emit_expr(left);
                self.out.push(' ');
                self.out.push_str(bin_op(*op));
                self.out.push(' ');
                self.emit_expr(right);
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.emit_expr(cond);
                self.out.push_str(" ? ");
                self.emit_expr(then);
                self.out.push_str(" : ");
                self.emit_expr(otherwise);
            }
            ExprKind::Spread(inner) => {
                self.out.push_str("...");
                self.emit_expr(inner);
            }
            ExprKind::Array(items) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_expr(item);
                }
                self.out.push(']');
            }
        }
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

fn var_keyword(kind: VarKind) -> &'static str {
    match kind {
        VarKind::Let => "let ",
        VarKind::Const => "const ",
    }
}

fn bin_op(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Identical => "===",
        BinOp::NotIdentical => "!==",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}
