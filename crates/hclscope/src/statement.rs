//! `var-decl` statements and length-sorted selection
use crate::reference::Ref;
use crate::scope::DirId;

/// Where a statement came from, for user-facing error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRange {
    pub source: Option<std::path::PathBuf>,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// The right-hand side of a statement.
#[derive(Debug, Clone)]
pub enum Rhs {
    /// Not yet evaluated.
    Expr(hcl::Expression),
    /// Already computed (e.g. a resolver-seeded value such as an env var).
    Value(hcl::Value),
    /// Constant empty object, produced by a labels-only block.
    Special,
    /// Deletes an inherited key rather than shadowing it with a value.
    /// Only produced by the run-environment resolver's `unset` marker.
    Unset,
}

/// An internal `var-decl` record produced from one attribute (possibly
/// expanded through nested object literals) of a `globals`-like block.
#[derive(derive_new::new, Debug, Clone)]
pub struct Stmt {
    /// Fully-qualified target reference.
    pub lhs: Ref,
    pub rhs: Rhs,
    /// User-facing reference at the declaration site.
    pub origin: Ref,
    pub scope: DirId,
    pub info: SourceRange,
}

/// A length-sorted (by `origin.path.len()` descending) collection of
/// statements produced by loading all `globals`-like blocks in a single
/// directory.
#[derive(Debug, Default, Clone)]
pub struct StatementList(Vec<Stmt>);

impl StatementList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a statement, keeping the length-sorted-descending invariant.
    /// Ties may appear in any order, so this is a stable insert by length.
    pub fn push(&mut self, stmt: Stmt) {
        let pos = self
            .0
            .partition_point(|existing| existing.origin.path.len() >= stmt.origin.path.len());
        self.0.insert(pos, stmt);
    }

    pub fn extend(&mut self, other: StatementList) {
        for stmt in other.0 {
            self.push(stmt);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stmt> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Select statements relevant to `r`, per the primary / contained-by /
    /// stop table.
    ///
    /// Returns the sub-list and whether an exact match ("found") was hit.
    pub fn select_by(&self, r: &Ref) -> (StatementList, bool) {
        let mut primary = StatementList::new();
        let mut contained_by = StatementList::new();
        let mut found = false;

        for stmt in &self.0 {
            if stmt.lhs.has(r) {
                primary.push(stmt.clone());
                if stmt.origin.equal(r) || stmt.lhs.equal(r) {
                    found = true;
                }
            } else if found {
                // past the matching family: the length-sorted invariant
                // means nothing further can refine `r`.
                break;
            } else if r.has(&stmt.lhs) {
                contained_by.push(stmt.clone());
            }
            // else: diverging branch, skip.
        }

        if found {
            return (primary, true);
        }

        primary.extend(contained_by);
        (primary, false)
    }
}

impl<'a> IntoIterator for &'a StatementList {
    type Item = &'a Stmt;
    type IntoIter = std::slice::Iter<'a, Stmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
