// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Query cache rewriting over whole programs.

mod common;

use common::Fixture;
use quarry_ast::expr::BindingName;
use quarry_ast::stmt::VarKind;
use quarry_transform::{Config, ConfigError, Severity};

#[test]
fn global_owner_query_is_hoisted_file_wide() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "world"]);
    let query = fx.query("world", &["A", "B"]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e", "a", "b"]), query, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(out.matches(".cached()").count(), 1);
    assert!(out.contains("const query_"));
    assert!(out.contains("world.query(A, B).cached()"));
    assert!(out.contains(".archetypes()"));
    // hoisted after the import, before the function
    let decl_at = out.find("const query_").unwrap();
    assert!(decl_at > out.find("import {").unwrap());
    assert!(decl_at < out.find("function system").unwrap());
    // loop inlined into archetype/row iteration
    assert!(out.contains("for (const archetype_"));
    assert!(out.contains("columns_map"));
    assert!(out.contains("for (let row_"));
    assert!(!out.contains("for (const [e, a, b]"));
}

#[test]
fn destructured_local_owner_caches_in_function_scope() {
    let mut fx = Fixture::new();
    fx.oracle.hint_value_type("world", fx.world_ty);
    let import = fx.ecs_import(&["A", "B"]);
    let info = fx.f.ident("info");
    let destructure = fx.f.var_decl(
        VarKind::Const,
        vec![quarry_ast::stmt::Declarator {
            name: BindingName::Object(vec!["world".into()]),
            init: Some(info),
        }],
    );
    let query = fx.query("world", &["A", "B"]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e", "a"]), query, vec![]);
    let func = fx.f.function(
        "system",
        vec![BindingName::Ident("info".into())],
        vec![destructure, loop_stmt],
    );

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    assert_eq!(out.matches(".cached()").count(), 1);
    // stable owner: a const pair, hoisted inside the function, after
    // the destructuring statement it depends on
    let fn_at = out.find("function system").unwrap();
    let owner_at = out.find("{ world } = info").unwrap();
    let decl_at = out.find("const query_").unwrap();
    assert!(fn_at < owner_at);
    assert!(owner_at < decl_at);
    assert!(!out.contains("ownerKey_"));
}

#[test]
fn parameter_owner_gets_invalidation_guard() {
    let mut fx = Fixture::new();
    fx.oracle.hint_value_type("world", fx.world_ty);
    let import = fx.ecs_import(&["A"]);
    let query = fx.query("world", &["A"]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), query, vec![]);
    let func = fx.f.function(
        "system",
        vec![BindingName::Ident("world".into())],
        vec![loop_stmt],
    );

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    // uninitialized slots plus the owner-identity guard
    assert!(out.contains("let query_"));
    assert!(out.contains("let ownerKey_"));
    assert!(out.contains("!== world"));
    assert!(out.contains("if (ownerKey_"));
    assert!(out.contains("= world.query(A).cached()"));
    assert_eq!(out.matches(".cached()").count(), 1);
    // guard precedes the loop, inside the function
    let guard_at = out.find("if (ownerKey_").unwrap();
    let loop_at = out.find("for (const archetype_").unwrap();
    assert!(out.find("function system").unwrap() < guard_at);
    assert!(guard_at < loop_at);
}

#[test]
fn two_functions_sharing_a_global_owner_each_get_their_own_pair() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "world"]);
    let first_query = fx.query("world", &["A"]);
    let first_loop = fx.query_loop(Fixture::pattern(&["e"]), first_query, vec![]);
    let first = fx.f.function("updateHealth", vec![], vec![first_loop]);
    let second_query = fx.query("world", &["A"]);
    let second_loop = fx.query_loop(Fixture::pattern(&["e"]), second_query, vec![]);
    let second = fx.f.function("updateMana", vec![], vec![second_loop]);

    let (out, diagnostics) = fx.run(vec![import, first, second]);

    assert!(diagnostics.is_empty());
    assert_eq!(out.matches(".cached()").count(), 2);
    // both pairs live at the top level, before either function
    let first_fn = out.find("function updateHealth").unwrap();
    let mut cached_sites = out.match_indices(".cached()").map(|(i, _)| i);
    assert!(cached_sites.all(|i| i < first_fn));
}

#[test]
fn stored_query_variable_reuses_one_binding() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "world"]);
    let init = fx.query("world", &["A"]);
    let store = fx.f.single_decl(VarKind::Const, "q", Some(init));
    let q1 = fx.f.ident("q");
    let first = fx.query_loop(Fixture::pattern(&["e1"]), q1, vec![]);
    let q2 = fx.f.ident("q");
    let second = fx.query_loop(Fixture::pattern(&["e2"]), q2, vec![]);
    let func = fx.f.function("system", vec![], vec![store, first, second]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    // the query itself is cached exactly once
    assert_eq!(out.matches(".cached()").count(), 1);
    assert!(out.contains("const q = query_"));
    // both loops inline against the stored variable's partitions
    assert_eq!(out.matches("for (const archetype_").count(), 2);
    assert_eq!(out.matches("q.archetypes()").count(), 2);
}

#[test]
fn opt_out_marker_suppresses_all_rewriting() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "world"]);
    let mut query = fx.query("world", &["A", "B"]);
    query.trivia = Some("no-cache".into());
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e", "a"]), query, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    assert!(!out.contains(".cached()"));
    assert!(!out.contains("archetype_"));
    assert!(out.contains("for (const [e, a] of /* no-cache */ world.query(A, B))"));
}

#[test]
fn non_static_ternary_degrades_gracefully_with_one_diagnostic() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "world"]);
    let r = fx.f.ident("r");
    let half = fx.f.number(0.5);
    let cond = fx.f.binary(quarry_ast::expr::BinOp::Gt, r, half);
    let a = fx.f.ident("A");
    let b = fx.f.ident("B");
    let pick = fx.f.ternary(cond, a, b);
    let owner = fx.f.ident("world");
    let query = fx.f.method_call(owner, "query", vec![pick]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), query, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    // exactly one warning, naming the offending ternary
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert!(diagnostics[0].message.contains("'r > 0.5 ? A : B' isn't simple"));
    assert!(diagnostics[0].message.contains("will not be cached"));
    // call-site and loop left completely unmodified
    assert!(!out.contains(".cached()"));
    assert!(!out.contains("archetype_"));
    assert!(out.contains("for (const [e] of world.query(r > 0.5 ? A : B))"));
}

#[test]
fn spread_arguments_are_rejected() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["world"]);
    let comps = fx.f.ident("comps");
    let spread = fx.f.spread(comps);
    let owner = fx.f.ident("world");
    let query = fx.f.method_call(owner, "query", vec![spread]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&[""]), query, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("'...comps' isn't simple"));
    assert!(!out.contains(".cached()"));
}

#[test]
fn silent_configuration_suppresses_warnings() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "world"]);
    let a = fx.f.ident("A");
    let b = fx.f.ident("B");
    let cond = fx.f.bool(true);
    let pick = fx.f.ternary(cond, a, b);
    let owner = fx.f.ident("world");
    let query = fx.f.method_call(owner, "query", vec![pick]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), query, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let config = Config {
        silent: true,
        ..Config::default()
    };
    let (out, diagnostics) = fx.run_with(vec![import, func], &config);

    assert!(diagnostics.is_empty());
    assert!(!out.contains(".cached()"));
}

#[test]
fn filter_modifiers_ride_along_into_the_cached_query() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "C", "world"]);
    let query = fx.query("world", &["A"]);
    let b = fx.f.ident("B");
    let with_call = fx.f.method_call(query, "with", vec![b]);
    let c = fx.f.ident("C");
    let chain = fx.f.method_call(with_call, "without", vec![c]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["id"]), chain, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    assert!(out.contains("world.query(A).with(B).without(C).cached()"));
    assert!(out.contains("for (const archetype_"));
    // filter arguments never become component columns
    assert!(!out.contains("columns_map"));
}

#[test]
fn manual_caching_is_honored_and_still_inlined() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "world"]);
    let query = fx.query("world", &["A"]);
    let chain = fx.f.method_call(query, "cached", vec![]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), chain, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let (out, diagnostics) = fx.run(vec![import, func]);

    assert!(diagnostics.is_empty());
    // only the author's cached() call; nothing hoisted
    assert_eq!(out.matches(".cached()").count(), 1);
    assert!(!out.contains("archetypes_"));
    // the loop still inlines, reading partitions straight off it
    assert!(out.contains(".cached().archetypes()"));
    assert!(out.contains("for (const archetype_"));
}

#[test]
fn wrapper_symbols_are_matched_by_declaration_site() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "B", "world"]);
    let query = fx.query("world", &["A"]);
    let with_member = fx.f.member(query, "with");
    let with_member_id = with_member.id;
    let b = fx.f.ident("B");
    let chain = fx.f.call(with_member, vec![b]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), chain, vec![]);
    let func = fx.f.function("system", vec![], vec![loop_stmt]);

    let file = fx.file(vec![import, func]);
    fx.oracle.bind_unit(&file);
    // the host reports a fresh wrapper symbol for the generic member
    let wrapper = fx.oracle.wrapper_of(fx.with_method);
    fx.oracle.rebind(with_member_id, wrapper);

    let result = quarry_transform::transform_file(file, &fx.oracle, &Config::default())
        .expect("transform succeeds");
    let out = quarry_print::print_unit(&result.file);

    assert!(result.diagnostics.is_empty());
    assert!(out.contains("world.query(A).with(B).cached()"));
}

#[test]
fn arrow_bodies_open_their_own_caching_scope() {
    let mut fx = Fixture::new();
    fx.oracle.hint_value_type("world", fx.world_ty);
    let import = fx.ecs_import(&["A"]);
    let query = fx.query("world", &["A"]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), query, vec![]);
    let arrow = fx
        .f
        .arrow(vec![BindingName::Object(vec!["world".into()])], vec![loop_stmt]);
    let system = fx.f.single_decl(VarKind::Const, "system", Some(arrow));

    let (out, diagnostics) = fx.run(vec![import, system]);

    assert!(diagnostics.is_empty());
    // the destructured parameter is a dynamic owner: guard and slots
    // live inside the arrow body, not at the top level
    let arrow_at = out.find("({ world }) =>").unwrap();
    assert!(out.find("let query_").unwrap() > arrow_at);
    assert!(out.find("if (ownerKey_").unwrap() > arrow_at);
    assert!(out.contains("for (const archetype_"));
}

#[test]
fn missing_package_aborts_the_run() {
    let mut fx = Fixture::new();
    let import = fx.ecs_import(&["A", "world"]);
    let query = fx.query("world", &["A"]);
    let loop_stmt = fx.query_loop(Fixture::pattern(&["e"]), query, vec![]);
    let file = fx.file(vec![import, loop_stmt]);
    fx.oracle.bind_unit(&file);

    let config = Config {
        package: "@missing/ecs".into(),
        ..Config::default()
    };
    let err = quarry_transform::transform_file(file, &fx.oracle, &config).unwrap_err();
    assert!(matches!(err, ConfigError::PackageNotFound(_)));
}
