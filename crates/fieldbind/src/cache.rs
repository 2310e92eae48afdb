//! # Cache invalidation
//!
//! Three entry points, all idempotent:
//!
//! - [`CacheController::clear`]: requested categories on one node. Explicit,
//!   so it ignores the node's never-auto-clear flag.
//! - [`CacheController::clear_subtree`]: depth-first over every initialized
//!   node below (and including) a root. Uninitialized nodes have nothing cached
//!   and their subtrees are skipped without being initialized.
//! - [`CacheController::clear_along_context_chain`]: the ancestors of a node,
//!   top-down, optionally excluding the top-level scope.
//!
//! Propagated clears (subtree, context chain) respect the never-auto-clear
//! flag: such a node keeps its computed value and option caches, while the
//! tree-held categories are still cleared.

use crate::state::CacheKind;
use crate::tree::{FieldId, FieldTree};
use tracing::trace;

/// Tree whose nodes hold clearable caches.
pub trait CacheTarget: FieldTree {
    /// Clears the categories on one node. Returns whether anything was held.
    fn clear_node(&mut self, id: FieldId, kinds: &[CacheKind]) -> bool;

    fn never_auto_clear(&self, id: FieldId) -> bool;
}

pub struct CacheController<'a, T: CacheTarget> {
    tree: &'a mut T,
}

impl<'a, T: CacheTarget> CacheController<'a, T> {
    pub fn new(tree: &'a mut T) -> Self {
        Self { tree }
    }

    pub fn clear(&mut self, id: FieldId, kinds: &[CacheKind]) -> bool {
        let cleared = self.tree.clear_node(id, kinds);
        if cleared {
            trace!(field = %id, ?kinds, "Cache cleared");
        }
        cleared
    }

    fn auto_clear(&mut self, id: FieldId, kinds: &[CacheKind]) -> bool {
        if self.tree.never_auto_clear(id) {
            let kept: Vec<CacheKind> = kinds
                .iter()
                .copied()
                .filter(|k| !CacheKind::COMPUTED.contains(k))
                .collect();
            return self.clear(id, &kept);
        }
        self.clear(id, kinds)
    }

    /// Returns the number of nodes that actually dropped something.
    pub fn clear_subtree(&mut self, root: FieldId, kinds: &[CacheKind]) -> usize {
        let mut cleared = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.tree.is_initialized(id) {
                continue;
            }
            if self.auto_clear(id, kinds) {
                cleared += 1;
            }
            // reversed so children are visited in order
            stack.extend(self.tree.children(id).iter().rev().copied());
        }
        cleared
    }

    /// Clears the ancestors of `id`, top-level scope first.
    pub fn clear_along_context_chain(
        &mut self,
        id: FieldId,
        include_root: bool,
        kinds: &[CacheKind],
    ) -> usize {
        let mut chain = Vec::new();
        let mut current = self.tree.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.tree.parent(p);
        }
        if !include_root {
            // the last entry is the top-level scope
            chain.pop();
        }

        let mut cleared = 0;
        for ancestor in chain.into_iter().rev() {
            if self.auto_clear(ancestor, kinds) {
                cleared += 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Minimal tree recording clear order.
    #[derive(Default)]
    struct TestTree {
        parents: HashMap<FieldId, FieldId>,
        children: HashMap<FieldId, Vec<FieldId>>,
        initialized: HashSet<FieldId>,
        cached: HashSet<FieldId>,
        pinned: HashSet<FieldId>,
        log: Vec<FieldId>,
    }

    impl TestTree {
        fn add(&mut self, parent: usize, child: usize) {
            let (p, c) = (FieldId::from_raw(parent), FieldId::from_raw(child));
            self.parents.insert(c, p);
            self.children.entry(p).or_default().push(c);
        }

        fn fill(&mut self, ids: &[usize]) {
            for id in ids {
                self.initialized.insert(FieldId::from_raw(*id));
                self.cached.insert(FieldId::from_raw(*id));
            }
        }
    }

    impl FieldTree for TestTree {
        fn root(&self) -> FieldId {
            FieldId::from_raw(0)
        }

        fn parent(&self, id: FieldId) -> Option<FieldId> {
            self.parents.get(&id).copied()
        }

        fn children(&self, id: FieldId) -> &[FieldId] {
            self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
        }

        fn is_initialized(&self, id: FieldId) -> bool {
            self.initialized.contains(&id)
        }
    }

    impl CacheTarget for TestTree {
        fn clear_node(&mut self, id: FieldId, kinds: &[CacheKind]) -> bool {
            if !kinds.contains(&CacheKind::Value) {
                return false;
            }
            let cleared = self.cached.remove(&id);
            if cleared {
                self.log.push(id);
            }
            cleared
        }

        fn never_auto_clear(&self, id: FieldId) -> bool {
            self.pinned.contains(&id)
        }
    }

    /// 0 ─┬─ 1 ─┬─ 3
    ///    │     └─ 4
    ///    └─ 2 ─── 5
    fn tree() -> TestTree {
        let mut t = TestTree::default();
        t.add(0, 1);
        t.add(0, 2);
        t.add(1, 3);
        t.add(1, 4);
        t.add(2, 5);
        t
    }

    fn ids(raw: &[usize]) -> Vec<FieldId> {
        raw.iter().map(|i| FieldId::from_raw(*i)).collect()
    }

    #[test]
    fn subtree_is_depth_first() {
        let mut t = tree();
        t.fill(&[0, 1, 2, 3, 4, 5]);
        let n = CacheController::new(&mut t).clear_subtree(FieldId::from_raw(0), CacheKind::ALL);
        assert_eq!(n, 6);
        assert_eq!(t.log, ids(&[0, 1, 3, 4, 2, 5]));
    }

    #[test]
    fn subtree_skips_uninitialized_branches() {
        let mut t = tree();
        t.fill(&[0, 1, 3]);
        // 5 holds a cache but its parent 2 was never initialized
        t.cached.insert(FieldId::from_raw(5));
        t.initialized.insert(FieldId::from_raw(5));
        CacheController::new(&mut t).clear_subtree(FieldId::from_raw(0), CacheKind::ALL);
        assert_eq!(t.log, ids(&[0, 1, 3]));
        assert!(!t.initialized.contains(&FieldId::from_raw(2)));
    }

    #[test]
    fn context_chain_is_top_down() {
        let mut t = tree();
        t.fill(&[0, 1, 3]);
        let n = CacheController::new(&mut t).clear_along_context_chain(
            FieldId::from_raw(3),
            true,
            CacheKind::COMPUTED,
        );
        assert_eq!(n, 2);
        assert_eq!(t.log, ids(&[0, 1]));
        assert!(t.cached.contains(&FieldId::from_raw(3)));
    }

    #[test]
    fn context_chain_can_exclude_root() {
        let mut t = tree();
        t.fill(&[0, 1, 3]);
        CacheController::new(&mut t).clear_along_context_chain(
            FieldId::from_raw(3),
            false,
            CacheKind::COMPUTED,
        );
        assert_eq!(t.log, ids(&[1]));
    }

    #[test]
    fn pinned_nodes_survive_propagation_but_not_explicit_clear() {
        let mut t = tree();
        t.fill(&[0, 1, 3]);
        t.pinned.insert(FieldId::from_raw(1));
        let mut cc = CacheController::new(&mut t);
        cc.clear_subtree(FieldId::from_raw(0), CacheKind::ALL);
        assert!(cc.clear(FieldId::from_raw(1), &[CacheKind::Value]));
        assert_eq!(t.log, ids(&[0, 3, 1]));
    }

    #[test]
    fn clearing_twice_is_a_no_op() {
        let mut t = tree();
        t.fill(&[0, 1, 2, 3, 4, 5]);
        let mut cc = CacheController::new(&mut t);
        assert_eq!(cc.clear_subtree(FieldId::from_raw(1), CacheKind::ALL), 3);
        assert_eq!(cc.clear_subtree(FieldId::from_raw(1), CacheKind::ALL), 0);
        assert!(!cc.clear(FieldId::from_raw(3), CacheKind::ALL));
    }
}
