//! End-to-end partial rewriting scenarios
use hclscope::evaluator::Evaluator;
use hclscope::rewriter::PartialRewriter;
use hclscope::scope::DirTree;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn fixture(case: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(case)
}

fn evaluator_at(case: &str, leaf: &str) -> (Evaluator, hclscope::scope::DirId) {
    let root = fixture(case);
    let cwd = if leaf.is_empty() { root.clone() } else { root.join(leaf) };

    let mut evaluator = Evaluator::with_default_resolvers(DirTree::new(), indexmap::IndexMap::new());
    let scope = evaluator.insert_dir(&cwd, &root);
    (evaluator, scope)
}

#[test]
fn rewrite_substitutes_global_traversal_and_leaves_other_namespaces_alone() {
    let (mut ev, scope) = evaluator_at("extending_parent", "child");

    let mut expr: hcl::Expression = "[global.team, local.untouched]".parse().unwrap();
    PartialRewriter::new(&mut ev, scope).rewrite(&mut expr).unwrap();

    let rendered = expr.to_string();
    assert!(rendered.contains("\"platform\""));
    assert!(rendered.contains("local.untouched"));
}

#[test]
fn rewrite_evaluates_tm_call_over_a_global_and_leaves_other_namespace_alone() {
    let (mut ev, scope) = evaluator_at("shadows_parent", "child");

    let mut expr: hcl::Expression = "tm_upper(global.team) + other.value".parse().unwrap();
    PartialRewriter::new(&mut ev, scope).rewrite(&mut expr).unwrap();

    let rendered = expr.to_string();
    assert!(rendered.contains("\"PLATFORM\""));
    assert!(rendered.contains("other.value"));
}

#[test]
fn rewrite_collapses_interpolation_of_resolved_globals() {
    let (mut ev, scope) = evaluator_at("shadows_parent", "child");

    let mut expr: hcl::Expression = "\"${global.team}/${global.env}\"".parse().unwrap();
    PartialRewriter::new(&mut ev, scope).rewrite(&mut expr).unwrap();

    let hcl::Expression::TemplateExpr(template_expr) = &expr else {
        panic!("expected template expr")
    };
    assert_eq!(template_expr.to_string(), "platform/staging");
}
