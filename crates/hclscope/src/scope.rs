//! Directory arena and the hierarchical scope resolver (C3)
use crate::reference::Ref;
use crate::statement::StatementList;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Arena index into a [DirTree]. Kept as a plain integer so the tree never
/// needs cyclic `Rc`/`RefCell` back-references for "parent".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(usize);

impl DirId {
    /// The tree's root directory, always index 0 once at least one
    /// directory has been inserted.
    pub fn root() -> Self {
        DirId(0)
    }
}

#[derive(Debug)]
struct DirNode {
    path: PathBuf,
    parent: Option<DirId>,
}

/// An arena of directories with parent links, immutable once built for a
/// run (the directory tree does not change while an [crate::evaluator::Evaluator]
/// is alive).
#[derive(Debug, Default)]
pub struct DirTree {
    nodes: Vec<DirNode>,
    by_path: HashMap<PathBuf, DirId>,
}

impl DirTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `path` with `parent`, or return its existing id.
    pub fn insert(&mut self, path: &Path, parent: Option<DirId>) -> DirId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }

        let id = DirId(self.nodes.len());
        self.nodes.push(DirNode {
            path: path.to_path_buf(),
            parent,
        });
        self.by_path.insert(path.to_path_buf(), id);
        id
    }

    /// Insert `path` and every ancestor up to (and including) `root`,
    /// linking each to its immediate parent.
    pub fn insert_chain(&mut self, path: &Path, root: &Path) -> DirId {
        if let Some(id) = self.by_path.get(path) {
            return *id;
        }

        let parent = path
            .parent()
            .filter(|parent| parent.starts_with(root) || *parent == root)
            .map(|parent| self.insert_chain(parent, root));

        self.insert(path, parent)
    }

    pub fn path(&self, dir: DirId) -> &Path {
        &self.nodes[dir.0].path
    }

    pub fn parent(&self, dir: DirId) -> Option<DirId> {
        self.nodes[dir.0].parent
    }

    pub fn dir_of(&self, path: &Path) -> Option<DirId> {
        self.by_path.get(path).copied()
    }
}

/// A loader for a single directory's statement list, e.g. "read all
/// `globals` blocks under this directory". Kept behind a trait so
/// [crate::scope::ScopeCache] doesn't need to know about HCL parsing.
pub trait StatementLoader {
    fn load(&self, dir: &Path) -> Result<StatementList, crate::error::LoadError>;
}

/// `DirId -> StatementList`, populated lazily on first access.
#[derive(Debug, Default)]
pub struct ScopeCache {
    entries: HashMap<DirId, StatementList>,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_load(
        &mut self,
        tree: &DirTree,
        dir: DirId,
        loader: &dyn StatementLoader,
    ) -> Result<&StatementList, crate::error::LoadError> {
        if !self.entries.contains_key(&dir) {
            let list = loader.load(tree.path(dir))?;
            tracing::debug!(dir = %tree.path(dir).display(), statements = list.len(), "loaded scope");
            self.entries.insert(dir, list);
        }

        Ok(self.entries.get(&dir).unwrap())
    }

    /// `lookup_stmts_at` per spec: select locally, recurse to parent on
    /// `found == false`, concatenate child-before-parent.
    pub fn lookup_stmts_at(
        &mut self,
        tree: &DirTree,
        dir: DirId,
        r: &Ref,
        loader: &dyn StatementLoader,
    ) -> Result<StatementList, crate::error::LoadError> {
        let local = self.get_or_load(tree, dir, loader)?;
        let (mut selected, found) = local.select_by(r);

        if found {
            return Ok(selected);
        }

        if let Some(parent) = tree.parent(dir) {
            let from_parent = self.lookup_stmts_at(tree, parent, r, loader)?;
            selected.extend(from_parent);
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_chain_links_ancestors() {
        let root = PathBuf::from("/tmp/root");
        let mut tree = DirTree::new();
        let leaf = root.join("a/b");

        let leaf_id = tree.insert_chain(&leaf, &root);
        let b_id = tree.dir_of(&root.join("a/b")).unwrap();
        let a_id = tree.dir_of(&root.join("a")).unwrap();
        let root_id = tree.dir_of(&root).unwrap();

        assert_eq!(leaf_id, b_id);
        assert_eq!(tree.parent(b_id), Some(a_id));
        assert_eq!(tree.parent(a_id), Some(root_id));
        assert_eq!(tree.parent(root_id), None);
    }
}
