use crate::types::NodeKey;
use std::collections::{HashMap, HashSet};

/// Nodes considered changed between two snapshots.
///
/// Leaves are tracked in a set. Elements map to `true` when the element itself
/// was changed and `false` when it is only dirty because a descendant changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub leaves: HashSet<NodeKey>,
    pub elements: HashMap<NodeKey, bool>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_leaf(&mut self, key: NodeKey) {
        self.leaves.insert(key);
    }

    /// Marks an element. An intentional mark is never downgraded.
    pub fn mark_element(&mut self, key: NodeKey, intentional: bool) {
        let entry = self.elements.entry(key).or_insert(intentional);
        *entry |= intentional;
    }

    pub fn is_dirty(&self, key: NodeKey) -> bool {
        self.leaves.contains(&key) || self.elements.contains_key(&key)
    }

    pub fn is_intentional(&self, key: NodeKey) -> bool {
        self.elements.get(&key).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty() && self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.leaves.len() + self.elements.len()
    }

    pub fn clear(&mut self) {
        self.leaves.clear();
        self.elements.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intentional_mark_is_sticky() {
        let mut dirty = DirtySet::new();
        dirty.mark_element(NodeKey(1), true);
        dirty.mark_element(NodeKey(1), false);
        assert!(dirty.is_intentional(NodeKey(1)));

        dirty.mark_element(NodeKey(2), false);
        assert!(!dirty.is_intentional(NodeKey(2)));
        dirty.mark_element(NodeKey(2), true);
        assert!(dirty.is_intentional(NodeKey(2)));
    }

    #[test]
    fn leaves_and_elements_are_both_dirty() {
        let mut dirty = DirtySet::new();
        assert!(dirty.is_empty());
        dirty.mark_leaf(NodeKey(5));
        dirty.mark_element(NodeKey(1), false);
        assert!(dirty.is_dirty(NodeKey(5)));
        assert!(dirty.is_dirty(NodeKey(1)));
        assert!(!dirty.is_dirty(NodeKey(2)));
        assert_eq!(dirty.len(), 2);
        dirty.clear();
        assert!(dirty.is_empty());
    }
}
