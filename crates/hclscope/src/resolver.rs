//! Namespace resolver protocol (spec.md §6) and the default resolver set
use crate::error::EvalError;
use crate::reference::Ref;
use crate::scope::{DirId, DirTree, ScopeCache, StatementLoader};
use crate::statement::{Rhs, SourceRange, Stmt, StatementList};

/// A capability implemented by anything the evaluator can dispatch a
/// reference's `object` field to.
pub trait Resolver {
    /// The namespace root this resolver serves, e.g. `"global"`.
    fn name(&self) -> &str;

    /// Candidate statements for `r`, honoring the selection rules of the
    /// statement model and, for hierarchical resolvers, folding in
    /// parent-scope results.
    fn lookup(
        &mut self,
        r: &Ref,
        scope_dir: DirId,
        dirs: &DirTree,
    ) -> Result<StatementList, EvalError>;
}

/// Hierarchical resolver backed by a directory tree of `globals` blocks.
pub struct GlobalsResolver {
    cache: ScopeCache,
    loader: Box<dyn StatementLoader>,
}

impl GlobalsResolver {
    pub fn new(loader: Box<dyn StatementLoader>) -> Self {
        Self {
            cache: ScopeCache::new(),
            loader,
        }
    }
}

impl Resolver for GlobalsResolver {
    fn name(&self) -> &str {
        "global"
    }

    fn lookup(
        &mut self,
        r: &Ref,
        scope_dir: DirId,
        dirs: &DirTree,
    ) -> Result<StatementList, EvalError> {
        self.cache
            .lookup_stmts_at(dirs, scope_dir, r, self.loader.as_ref())
            .map_err(EvalError::from)
    }
}

/// Hierarchical resolver for `run_env`-style blocks, identical to
/// [GlobalsResolver] except that an `unset` attribute deletes an inherited
/// key rather than shadowing it with a value (spec.md §6).
pub struct RunEnvResolver {
    cache: ScopeCache,
    loader: Box<dyn StatementLoader>,
}

impl RunEnvResolver {
    pub fn new(loader: Box<dyn StatementLoader>) -> Self {
        Self {
            cache: ScopeCache::new(),
            loader,
        }
    }
}

impl Resolver for RunEnvResolver {
    fn name(&self) -> &str {
        "let"
    }

    fn lookup(
        &mut self,
        r: &Ref,
        scope_dir: DirId,
        dirs: &DirTree,
    ) -> Result<StatementList, EvalError> {
        self.cache
            .lookup_stmts_at(dirs, scope_dir, r, self.loader.as_ref())
            .map_err(EvalError::from)
    }
}

/// Flat resolver, seeded once at construction; ignores scope.
pub struct FlatResolver {
    namespace: &'static str,
    values: indexmap::IndexMap<String, hcl::Value>,
}

impl FlatResolver {
    pub fn new(namespace: &'static str, values: indexmap::IndexMap<String, hcl::Value>) -> Self {
        Self { namespace, values }
    }

    /// Seeds a resolver for the `env` namespace directly from the process
    /// environment.
    pub fn from_process_env() -> Self {
        let values = std::env::vars()
            .map(|(k, v)| (k, hcl::Value::String(v)))
            .collect();
        Self::new("env", values)
    }

    /// Seeds a resolver for the `terramate` metadata namespace.
    pub fn terramate(metadata: indexmap::IndexMap<String, hcl::Value>) -> Self {
        Self::new("terramate", metadata)
    }
}

impl Resolver for FlatResolver {
    fn name(&self) -> &str {
        self.namespace
    }

    fn lookup(
        &mut self,
        r: &Ref,
        _scope_dir: DirId,
        _dirs: &DirTree,
    ) -> Result<StatementList, EvalError> {
        let mut list = StatementList::new();

        if r.path.is_empty() {
            // root-only ref: return every known leaf under this namespace
            for (key, value) in &self.values {
                let leaf = r.child(key.clone());
                list.push(Stmt::new(
                    leaf.clone(),
                    Rhs::Value(value.clone()),
                    leaf,
                    DirId::root(),
                    SourceRange::default(),
                ));
            }
            return Ok(list);
        }

        let Some(value) = self.values.get(&r.path[0]) else {
            return Ok(list);
        };

        let leaf = Ref::new(r.object.clone(), vec![r.path[0].clone()]);
        list.push(Stmt::new(
            leaf.clone(),
            Rhs::Value(value.clone()),
            leaf,
            DirId::root(),
            SourceRange::default(),
        ));

        Ok(list)
    }
}

/// The open-ended set of resolvers an [crate::evaluator::Evaluator] dispatches
/// to by a reference's `object` field.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: std::collections::HashMap<String, Box<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resolver: Box<dyn Resolver>) {
        self.resolvers.insert(resolver.name().to_string(), resolver);
    }

    pub fn get_mut(&mut self, namespace: &str) -> Option<&mut Box<dyn Resolver>> {
        self.resolvers.get_mut(namespace)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.resolvers.contains_key(namespace)
    }
}

