//! Lazy hierarchical evaluator (C4)
//!
//! Resolves only the references an expression actually needs, recursing
//! into dependency expressions on demand, then hands the fully-resolved
//! value tree to `hcl`'s own expression evaluator for the final
//! arithmetic/interpolation/conditional semantics.
use crate::error::EvalError;
use crate::functions::FunctionRegistry;
use crate::reference::{refs_of, Ref};
use crate::resolver::{FlatResolver, GlobalsResolver, ResolverRegistry, RunEnvResolver};
use crate::scope::{DirId, DirTree};
use crate::statement::Rhs;
use hcl::eval::Evaluate;
use hcl::Expression;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;

#[derive(Default)]
struct EvalState {
    /// `Ref::canonical_string() -> (Ref, resolved value)`, insertion-ordered
    /// so namespace projection is deterministic.
    leaves: IndexMap<String, (Ref, hcl::Value)>,
    /// Keys deleted by a `run_env` `unset` statement; once deleted, a
    /// same-key statement inherited from a parent scope is never visited.
    deleted: HashSet<String>,
}

/// Owns the directory tree and the namespace resolvers, and evaluates HCL
/// expressions against them lazily.
pub struct Evaluator {
    dirs: DirTree,
    resolvers: ResolverRegistry,
    functions: FunctionRegistry,
}

impl Evaluator {
    pub fn new(dirs: DirTree, resolvers: ResolverRegistry) -> Self {
        Self {
            dirs,
            resolvers,
            functions: FunctionRegistry::with_defaults(),
        }
    }

    /// Wires up the standard `global` / `let` / `env` / `terramate`
    /// resolver set over `dirs`.
    pub fn with_default_resolvers(
        dirs: DirTree,
        terramate_metadata: IndexMap<String, hcl::Value>,
    ) -> Self {
        let mut resolvers = ResolverRegistry::new();
        resolvers.register(Box::new(GlobalsResolver::new(Box::new(
            crate::loader::BlockLoader::globals(),
        ))));
        resolvers.register(Box::new(RunEnvResolver::new(Box::new(
            crate::loader::BlockLoader::run_env(),
        ))));
        resolvers.register(Box::new(FlatResolver::from_process_env()));
        resolvers.register(Box::new(FlatResolver::terramate(terramate_metadata)));
        Self::new(dirs, resolvers)
    }

    pub fn dirs(&self) -> &DirTree {
        &self.dirs
    }

    pub fn dir_of(&self, path: &Path) -> Option<DirId> {
        self.dirs.dir_of(path)
    }

    pub fn insert_dir(&mut self, path: &Path, root: &Path) -> DirId {
        self.dirs.insert_chain(path, root)
    }

    /// Evaluate `expr` as it appears in `scope`, resolving exactly the
    /// references it transitively depends on.
    pub fn eval(&mut self, expr: &Expression, scope: DirId) -> Result<hcl::Value, EvalError> {
        let mut state = EvalState::default();
        let mut visiting = Vec::new();
        self.resolve_refs(expr, scope, &mut state, &mut visiting)?;
        let ctx = self.build_context(expr, &state);
        expr.evaluate(&ctx).map_err(EvalError::from)
    }

    fn resolve_refs(
        &mut self,
        expr: &Expression,
        scope: DirId,
        state: &mut EvalState,
        visiting: &mut Vec<String>,
    ) -> Result<(), EvalError> {
        for r in refs_of(expr) {
            self.resolve_ref(&r, scope, state, visiting)?;
        }
        Ok(())
    }

    fn resolve_ref(
        &mut self,
        r: &Ref,
        scope: DirId,
        state: &mut EvalState,
        visiting: &mut Vec<String>,
    ) -> Result<(), EvalError> {
        let key = r.canonical_string();
        if state.leaves.contains_key(&key) || state.deleted.contains(&key) {
            return Ok(());
        }

        if visiting.contains(&key) {
            return Err(EvalError::Cycle { reference: r.clone() });
        }

        if !self.resolvers.contains(r.object.as_str()) {
            return Err(EvalError::UnknownNamespace {
                namespace: r.object.clone(),
            });
        }

        visiting.push(key);

        let result = self.resolve_ref_inner(r, scope, state, visiting);

        visiting.pop();
        result
    }

    fn resolve_ref_inner(
        &mut self,
        r: &Ref,
        scope: DirId,
        state: &mut EvalState,
        visiting: &mut Vec<String>,
    ) -> Result<(), EvalError> {
        let resolver = self
            .resolvers
            .get_mut(r.object.as_str())
            .expect("presence checked by caller");
        let stmts = resolver.lookup(r, scope, &self.dirs)?;

        if stmts.is_empty() {
            return Err(EvalError::Undeclared {
                reference: r.clone(),
            });
        }

        for stmt in stmts.iter() {
            let lhs_key = stmt.lhs.canonical_string();
            if state.leaves.contains_key(&lhs_key) || state.deleted.contains(&lhs_key) {
                continue;
            }

            match &stmt.rhs {
                Rhs::Special => {
                    state.leaves.insert(
                        lhs_key,
                        (stmt.lhs.clone(), hcl::Value::from(hcl::value::Map::new())),
                    );
                }
                Rhs::Value(v) => {
                    state.leaves.insert(lhs_key, (stmt.lhs.clone(), v.clone()));
                }
                Rhs::Unset => {
                    state.deleted.insert(lhs_key);
                }
                Rhs::Expr(e) => {
                    let scope_name = self.dirs.path(stmt.scope).display().to_string();

                    self.resolve_refs(e, stmt.scope, state, visiting)
                        .map_err(|err| err.with_breadcrumb(stmt.lhs.clone(), scope_name.clone()))?;

                    let ctx = self.build_context(e, state);
                    let value = e
                        .evaluate(&ctx)
                        .map_err(EvalError::from)
                        .map_err(|err| err.with_breadcrumb(stmt.lhs.clone(), scope_name))?;

                    state.leaves.insert(lhs_key, (stmt.lhs.clone(), value));
                }
            }
        }

        Ok(())
    }

    fn build_context(&self, expr: &Expression, state: &EvalState) -> hcl::eval::Context {
        let mut ctx = hcl::eval::Context::new();

        let mut namespaces = HashSet::new();
        for r in refs_of(expr) {
            namespaces.insert(r.object.as_str().to_string());
        }

        for ns in namespaces {
            ctx.declare_var(ns.clone(), project(&ns, &state.leaves));
        }

        self.functions.declare_into(&mut ctx);

        ctx
    }
}

/// Rebuild the nested object tree for `object` from its flat, evaluated
/// leaves (spec.md §4.4 step 3).
fn project(object: &str, leaves: &IndexMap<String, (Ref, hcl::Value)>) -> hcl::Value {
    let mut root = hcl::value::Map::new();
    for (r, value) in leaves.values() {
        if r.object.as_str() != object {
            continue;
        }
        insert_at(&mut root, &r.path, value.clone());
    }
    hcl::Value::from(root)
}

fn insert_at(map: &mut hcl::value::Map<String, hcl::Value>, path: &[String], value: hcl::Value) {
    match path {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry(first.clone())
                .or_insert_with(|| hcl::Value::from(hcl::value::Map::new()));
            if !matches!(entry, hcl::Value::Object(_)) {
                *entry = hcl::Value::from(hcl::value::Map::new());
            }
            let hcl::Value::Object(inner) = entry else {
                unreachable!("just normalized to an object")
            };
            insert_at(inner, rest, value);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::Resolver;
    use crate::scope::StatementLoader;
    use crate::statement::{SourceRange, Stmt, StatementList};

    struct FixedLoader(StatementList);

    impl StatementLoader for FixedLoader {
        fn load(&self, _dir: &Path) -> Result<StatementList, crate::error::LoadError> {
            Ok(self.0.clone())
        }
    }

    fn ref_(object: &str, path: &[&str]) -> Ref {
        Ref::new(
            hcl::Identifier::unchecked(object),
            path.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn leaf_stmt(path: &[&str], value: hcl::Value) -> Stmt {
        Stmt::new(
            ref_("global", path),
            Rhs::Value(value),
            ref_("global", path),
            DirId::root(),
            SourceRange::default(),
        )
    }

    fn single_dir_evaluator(stmts: StatementList) -> Evaluator {
        let mut dirs = DirTree::new();
        dirs.insert(Path::new("/root"), None);

        let mut resolvers = ResolverRegistry::new();
        resolvers.register(Box::new(GlobalsResolver::new(Box::new(FixedLoader(stmts)))));
        Evaluator::new(dirs, resolvers)
    }

    #[test]
    fn projects_sibling_leaves_into_one_object() {
        let mut stmts = StatementList::new();
        stmts.push(leaf_stmt(&["obj", "a"], hcl::Value::from(1)));
        stmts.push(leaf_stmt(&["obj", "b"], hcl::Value::from(2)));
        let mut ev = single_dir_evaluator(stmts);

        let expr: Expression = hcl::Traversal::builder(hcl::Variable::unchecked("global"))
            .attr("obj")
            .build()
            .into();

        let value = ev.eval(&expr, DirId::root()).unwrap();
        let hcl::Value::Object(obj) = value else {
            panic!("expected object")
        };
        assert_eq!(obj.get("a"), Some(&hcl::Value::from(1)));
        assert_eq!(obj.get("b"), Some(&hcl::Value::from(2)));
    }

    #[test]
    fn undeclared_reference_errors() {
        let mut ev = single_dir_evaluator(StatementList::new());
        let expr: Expression = hcl::Traversal::builder(hcl::Variable::unchecked("global"))
            .attr("missing")
            .build()
            .into();

        let err = ev.eval(&expr, DirId::root()).unwrap_err();
        assert!(matches!(err, EvalError::Undeclared { .. }));
    }

    #[test]
    fn unknown_namespace_errors() {
        let mut ev = single_dir_evaluator(StatementList::new());
        let expr: Expression = hcl::Traversal::builder(hcl::Variable::unchecked("nope"))
            .attr("a")
            .build()
            .into();

        let err = ev.eval(&expr, DirId::root()).unwrap_err();
        assert!(matches!(err, EvalError::UnknownNamespace { .. }));
    }

    #[test]
    fn self_referential_expression_is_a_cycle() {
        let mut stmts = StatementList::new();
        let cyclic_expr: Expression = hcl::Traversal::builder(hcl::Variable::unchecked("global"))
            .attr("a")
            .build()
            .into();
        stmts.push(Stmt::new(
            ref_("global", &["a"]),
            Rhs::Expr(cyclic_expr),
            ref_("global", &["a"]),
            DirId::root(),
            SourceRange::default(),
        ));
        let mut ev = single_dir_evaluator(stmts);

        let expr: Expression = hcl::Traversal::builder(hcl::Variable::unchecked("global"))
            .attr("a")
            .build()
            .into();

        let err = ev.eval(&expr, DirId::root()).unwrap_err();
        assert!(matches!(err, EvalError::WithBreadcrumb { .. }));
    }
}
