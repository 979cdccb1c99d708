// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Shared fixture: a fake oracle preloaded with the ECS library's
//! symbol surface, plus tree-building shorthand.

use quarry_ast::expr::{ArrayBindingElem, BindingName, Expr};
use quarry_ast::stmt::{Stmt, VarKind};
use quarry_ast::{NodeFactory, SourceFile};
use quarry_oracle::fake::FakeOracle;
use quarry_oracle::SymbolId;
use quarry_transform::{Config, Diagnostic};

#[allow(dead_code)]
pub struct Fixture {
    pub oracle: FakeOracle,
    pub f: NodeFactory,
    pub world_ty: SymbolId,
    pub query_ty: SymbolId,
    pub cached_ty: SymbolId,
    pub with_method: SymbolId,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let mut oracle = FakeOracle::new();
        let query_ty = oracle.define("Query");
        let cached_ty = oracle.define("CachedQuery");
        let world_ty = oracle.define("World");
        let query_method = oracle.define("query");
        let with_method = oracle.define("with");
        let without_method = oracle.define("without");
        let cached_method = oracle.define("cached");
        oracle.set_type_property(world_ty, "query", query_method);
        oracle.set_type_property(query_ty, "with", with_method);
        oracle.set_type_property(query_ty, "without", without_method);
        oracle.set_type_property(query_ty, "cached", cached_method);
        oracle.set_method_return(query_method, query_ty);
        oracle.set_method_return(with_method, query_ty);
        oracle.set_method_return(without_method, query_ty);
        oracle.set_method_return(cached_method, cached_ty);
        oracle.export("@rbxts/jecs", "Query", query_ty);
        oracle.export("@rbxts/jecs", "CachedQuery", cached_ty);
        oracle.export("@rbxts/jecs", "World", world_ty);
        let pair = oracle.define("pair");
        oracle.export("@rbxts/jecs", "pair", pair);

        let world = oracle.define("world");
        oracle.set_value_type(world, world_ty);
        oracle.export("./ecs", "world", world);
        for name in ["A", "B", "C", "P"] {
            let sym = oracle.define(name);
            oracle.export("./ecs", name, sym);
        }

        Self {
            oracle,
            f: NodeFactory::new(),
            world_ty,
            query_ty,
            cached_ty,
            with_method,
        }
    }

    pub fn ecs_import(&mut self, names: &[&str]) -> Stmt {
        self.f
            .import(names.iter().map(|n| n.to_string()).collect(), "./ecs")
    }

    pub fn jecs_import(&mut self, names: &[&str]) -> Stmt {
        self.f
            .import(names.iter().map(|n| n.to_string()).collect(), "@rbxts/jecs")
    }

    /// `<owner>.query(<components>)`
    pub fn query(&mut self, owner: &str, components: &[&str]) -> Expr {
        let owner = self.f.ident(owner);
        let args = components
            .iter()
            .map(|c| self.f.ident(*c))
            .collect::<Vec<_>>();
        self.f.method_call(owner, "query", args)
    }

    /// Array destructuring pattern; `""` marks an omitted slot.
    pub fn pattern(names: &[&str]) -> BindingName {
        BindingName::Array(
            names
                .iter()
                .map(|n| {
                    if n.is_empty() {
                        ArrayBindingElem::Omitted
                    } else {
                        ArrayBindingElem::Ident(n.to_string())
                    }
                })
                .collect(),
        )
    }

    /// `for (const <pattern> of <source>) { <body> }`
    pub fn query_loop(&mut self, pattern: BindingName, source: Expr, body: Vec<Stmt>) -> Stmt {
        let block = self.f.block(body);
        self.f.for_of(VarKind::Const, pattern, source, block)
    }

    pub fn file(&mut self, statements: Vec<Stmt>) -> SourceFile {
        SourceFile {
            id: self.f.fresh_id(),
            statements,
        }
    }

    /// Bind and transform with the default configuration; returns the
    /// rendered output and collected diagnostics.
    pub fn run(mut self, statements: Vec<Stmt>) -> (String, Vec<Diagnostic>) {
        let file = self.file(statements);
        self.oracle.bind_unit(&file);
        let result = quarry_transform::transform_file(file, &self.oracle, &Config::default())
            .expect("transform succeeds");
        (quarry_print::print_unit(&result.file), result.diagnostics)
    }

    pub fn run_with(
        mut self,
        statements: Vec<Stmt>,
        config: &Config,
    ) -> (String, Vec<Diagnostic>) {
        let file = self.file(statements);
        self.oracle.bind_unit(&file);
        let result = quarry_transform::transform_file(file, &self.oracle, config)
            .expect("transform succeeds");
        (quarry_print::print_unit(&result.file), result.diagnostics)
    }
}

/// Name of the column identifier a component is read from, e.g. the
/// `column_7` in `column_7 = field_5[A]`.
#[allow(dead_code)]
pub fn column_for<'a>(out: &'a str, component: &str) -> &'a str {
    let needle = format!("[{component}]");
    let idx = out.find(&needle).expect("component column access");
    let before = &out[..idx];
    let eq = before.rfind(" = ").expect("column assignment");
    let head = &before[..eq];
    let start = head
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_'))
        .map(|i| i + 1)
        .unwrap_or(0);
    &head[start..eq]
}

/// Name of the column identifier a destructured binding reads, e.g.
/// the `column_7` in `va = column_7[row_3]`.
#[allow(dead_code)]
pub fn binding_source<'a>(out: &'a str, binding: &str) -> &'a str {
    let needle = format!("{binding} = ");
    let idx = out.find(&needle).expect("binding declaration") + needle.len();
    let rest = &out[idx..];
    let end = rest.find('[').expect("indexed read");
    &rest[..end]
}
