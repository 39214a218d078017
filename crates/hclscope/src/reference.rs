//! Canonical representation of a variable reference (`namespace.path.to.leaf`)
use hcl::{Expression, Traversal, TraversalOperator};

/// A reference into a namespace value tree, e.g. `global.obj.a` or `env.HOME`.
#[derive(derive_new::new, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ref {
    #[new(into)]
    pub object: hcl::Identifier,
    pub path: Vec<String>,
}

impl Ref {
    pub fn root(object: impl Into<hcl::Identifier>) -> Self {
        Self::new(object, Vec::new())
    }

    /// Parse a traversal (`expr.operators`) into a [`Ref`].
    ///
    /// Splat operators and non-string index operators stop path accumulation
    /// at the first such element; the partial ref still covers the object
    /// reached up to that point.
    pub fn parse(traversal: &Traversal) -> Option<Self> {
        let Expression::Variable(var) = &traversal.expr else {
            return None;
        };

        let mut path = Vec::new();
        for operator in &traversal.operators {
            match operator {
                TraversalOperator::GetAttr(ident) => path.push(ident.as_str().to_string()),
                TraversalOperator::Index(Expression::String(s)) => path.push(s.clone()),
                TraversalOperator::Index(_) | TraversalOperator::FullSplat | TraversalOperator::AttrSplat => {
                    break
                }
                _ => break,
            }
        }

        Some(Ref::new(var.clone(), path))
    }

    /// `A.has(B)`: B designates a subtree at or below A - A's path is a
    /// prefix of (or equal to) B's path, and both share the same `object`.
    /// Asymmetric when the paths differ in length: a parent `has` its
    /// child, but a child does not `have` its parent.
    pub fn has(&self, other: &Ref) -> bool {
        if self.object != other.object {
            return false;
        }

        self.path.len() <= other.path.len() && other.path[..self.path.len()] == self.path[..]
    }

    pub fn equal(&self, other: &Ref) -> bool {
        self == other
    }

    /// `object["p1"]["p2"]...` with JSON-style escaping of path segments.
    pub fn canonical_string(&self) -> String {
        let mut out = String::new();
        out.push_str(self.object.as_str());
        for segment in &self.path {
            out.push('[');
            out.push_str(&serde_json::to_string(segment).expect("string always serializes"));
            out.push(']');
        }
        out
    }

    /// `self` extended by one more path segment.
    pub fn child(&self, segment: impl Into<String>) -> Ref {
        let mut path = self.path.clone();
        path.push(segment.into());
        Ref::new(self.object.clone(), path)
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

/// Walk `expr`, enumerating every traversal and producing a unique set of
/// [`Ref`]s keyed by canonical string, preserving first-encounter order.
pub fn refs_of(expr: &Expression) -> Vec<Ref> {
    let mut collector = RefCollector::default();
    crate::visit::visit_traversals(expr, &mut |traversal| {
        if let Some(r) = Ref::parse(traversal) {
            collector.push(r);
        }
    });
    collector.refs
}

#[derive(Default)]
struct RefCollector {
    seen: std::collections::HashSet<String>,
    refs: Vec<Ref>,
}

impl RefCollector {
    fn push(&mut self, r: Ref) {
        if self.seen.insert(r.canonical_string()) {
            self.refs.push(r);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn r(object: &str, path: &[&str]) -> Ref {
        Ref::new(
            hcl::Identifier::unchecked(object),
            path.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn equal_is_reflexive() {
        let a = r("global", &["obj", "a"]);
        assert!(a.equal(&a));
        assert!(a.has(&a));
    }

    #[test]
    fn has_is_reflexive_but_asymmetric_across_lengths() {
        let parent = r("global", &["obj"]);
        let child = r("global", &["obj", "a"]);

        assert!(parent.has(&child));
        assert!(!child.has(&parent));
        assert!(!parent.equal(&child));
    }

    #[test]
    fn has_is_false_across_different_objects() {
        let a = r("global", &["obj"]);
        let b = r("env", &["obj"]);
        assert!(!a.has(&b));
    }

    #[test]
    fn has_is_false_on_diverging_branches() {
        let a = r("global", &["obj", "a"]);
        let b = r("global", &["obj", "b"]);
        assert!(!a.has(&b));
    }

    #[test]
    fn canonical_string_is_injective_over_object_and_path() {
        let a = r("global", &["obj", "a"]);
        let b = r("global", &["obj", "b"]);
        let c = r("global", &["obj"]);
        assert_ne!(a.canonical_string(), b.canonical_string());
        assert_ne!(a.canonical_string(), c.canonical_string());
        assert_eq!(
            r("global", &["a", "b"]).canonical_string(),
            "global[\"a\"][\"b\"]"
        );
    }
}
