//! Wrapper paths between productions.
//!
//! A variant whose body forwards to exactly one other production is a
//! delegate edge. To embed a node of an inner production where an outer one
//! is expected, the shortest chain of delegate variants from the outer to
//! the inner production is found by breadth-first search and each variant on
//! it becomes a wrapper node.
//!
//! Paths are cached per `(outer, inner)` pair. The grammar is immutable, so
//! racing writers only ever insert the same value.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::grammar::{Grammar, ProductionId, VariantId};
use crate::tree::Node;

type PathCache = FxHashMap<(ProductionId, ProductionId), Option<Arc<[VariantId]>>>;

/// Cache of delegate paths for one grammar.
#[derive(Debug, Default)]
pub struct Intermediates {
    cache: RwLock<PathCache>,
}

impl Intermediates {
    /// Delegate variants leading from `outer` down to `inner`, outermost
    /// first. The path is empty when the productions are equal.
    pub fn path(
        &self,
        grammar: &Grammar,
        outer: ProductionId,
        inner: ProductionId,
    ) -> Option<Arc<[VariantId]>> {
        if let Some(hit) = self.cache.read().get(&(outer, inner)) {
            return hit.clone();
        }
        let path = search(grammar, outer, inner).map(Arc::from);
        debug!(
            outer = grammar.production(outer).name(),
            inner = grammar.production(inner).name(),
            found = path.is_some(),
            "intermediate path computed"
        );
        self.cache
            .write()
            .entry((outer, inner))
            .or_insert(path)
            .clone()
    }

    /// Wraps `node` so that it stands for a value of `outer`.
    ///
    /// Anonymous variants on the path build no node. Every wrapper takes the
    /// source position of `node`.
    pub fn wrap(&self, grammar: &Grammar, node: Node, outer: ProductionId) -> Option<Node> {
        let path = self.path(grammar, outer, node.production())?;
        let position = node.source_position();
        let mut current = node;
        for variant in path.iter().rev() {
            if grammar.variant(*variant).is_anon() {
                continue;
            }
            current = Node::inner(grammar, *variant, vec![current])
                .ok()?
                .with_position(position);
        }
        Some(current)
    }

    /// Number of cached `(outer, inner)` pairs.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

fn search(grammar: &Grammar, outer: ProductionId, inner: ProductionId) -> Option<Vec<VariantId>> {
    if outer == inner {
        return Some(Vec::new());
    }
    let mut came_from: FxHashMap<ProductionId, (ProductionId, VariantId)> = FxHashMap::default();
    let mut seen = FxHashSet::default();
    let mut queue = VecDeque::from([outer]);
    seen.insert(outer);

    while let Some(current) = queue.pop_front() {
        for variant in grammar.production(current).variants() {
            let Some(next) = grammar.variant(*variant).delegate() else {
                continue;
            };
            if !seen.insert(next) {
                continue;
            }
            came_from.insert(next, (current, *variant));
            if next == inner {
                let mut path = Vec::new();
                let mut at = inner;
                while let Some((prev, via)) = came_from.get(&at) {
                    path.push(*via);
                    at = *prev;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, ParSer};
    use text_size::TextRange;

    #[test]
    fn shortest_path_is_preferred() {
        let mut b = GrammarBuilder::new();
        let a = b.production("A");
        let m = b.production("M");
        let c = b.production("C");
        let long = b.inner(a, "Long", ParSer::r(m)).id();
        let short = b.inner(a, "Short", ParSer::r(c)).id();
        b.inner(m, "Down", ParSer::r(c));
        b.leaf(c, "Leaf", ParSer::pattern("c").expect("pattern"));
        let grammar = b.build().expect("valid grammar");

        let path = grammar.intermediates().path(&grammar, a, c).expect("path");
        assert_eq!(&*path, &[short]);
        assert_ne!(path[0], long);
        assert_eq!(grammar.intermediates().cached(), 1);
        assert!(grammar.intermediates().path(&grammar, c, a).is_none());
        assert_eq!(grammar.intermediates().cached(), 2);
    }

    #[test]
    fn anonymous_steps_are_skipped_when_wrapping() {
        let mut b = GrammarBuilder::new();
        let a = b.production("A");
        let g = b.production("G");
        let c = b.production("C");
        let named = b.inner(a, "Named", ParSer::r(g)).id();
        b.inner(g, "Group", ParSer::r(c)).anon();
        let leaf = b.leaf(c, "Leaf", ParSer::pattern("c").expect("pattern")).id();
        let grammar = b.build().expect("valid grammar");

        let range = TextRange::new(2.into(), 3.into());
        let node = Node::leaf(&grammar, leaf, "c")
            .expect("leaf")
            .with_position(Some(range));
        let wrapped = grammar
            .intermediates()
            .wrap(&grammar, node.clone(), a)
            .expect("wraps");
        assert_eq!(wrapped.variant(), named);
        assert_eq!(wrapped.children(), &[node]);
        assert_eq!(wrapped.source_position(), Some(range));
    }
}
