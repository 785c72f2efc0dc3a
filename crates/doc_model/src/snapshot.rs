use crate::types::{Node, NodeKey};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable captured state of a whole document.
///
/// Snapshots are never mutated; [`DocumentWriter`](crate::DocumentWriter)
/// produces a new one per commit and shares every untouched node with the
/// previous snapshot.
#[derive(Clone, Debug)]
pub struct Snapshot {
    root: NodeKey,
    nodes: HashMap<NodeKey, Arc<Node>>,
}

impl Snapshot {
    pub fn new(root: NodeKey, nodes: HashMap<NodeKey, Arc<Node>>) -> Self {
        Self { root, nodes }
    }

    /// A document holding only an empty root.
    pub fn empty() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(NodeKey::ROOT, Arc::new(Node::root()));
        Self {
            root: NodeKey::ROOT,
            nodes,
        }
    }

    pub(crate) fn nodes(&self) -> &HashMap<NodeKey, Arc<Node>> {
        &self.nodes
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<&Arc<Node>> {
        self.nodes.get(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    /// `true` when both snapshots hold the very same payload for `key`.
    pub fn same_node(&self, other: &Snapshot, key: NodeKey) -> bool {
        match (self.nodes.get(&key), other.nodes.get(&key)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn children_of(&self, key: NodeKey) -> Option<&[NodeKey]> {
        self.nodes.get(&key).map(|node| node.children())
    }

    pub fn parent_of(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(&key).and_then(|node| node.parent())
    }

    pub fn index_in_parent(&self, key: NodeKey) -> Option<usize> {
        let parent = self.parent_of(key)?;
        self.children_of(parent)?.iter().position(|k| *k == key)
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent_of(key)?;
        let siblings = self.children_of(parent)?;
        let index = siblings.iter().position(|k| *k == key)?;
        siblings.get(index + 1).copied()
    }

    pub fn previous_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let parent = self.parent_of(key)?;
        let siblings = self.children_of(parent)?;
        let index = siblings.iter().position(|k| *k == key)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// Ancestors of `key`, nearest first. The node itself is not included.
    pub fn ancestors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut current = self.parent_of(key);
        while let Some(parent) = current {
            // A malformed parent chain must not loop forever.
            if out.len() > self.nodes.len() {
                log::warn!(target: "doc_model.snapshot", "parent chain of {key} does not terminate");
                break;
            }
            out.push(parent);
            current = self.parent_of(parent);
        }
        out
    }

    /// Pre-order keys reachable from the root. Dangling child keys are skipped.
    pub fn document_order(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            if out.len() > self.nodes.len() {
                log::warn!(target: "doc_model.snapshot", "cycle detected while walking from {}", self.root);
                break;
            }
            out.push(key);
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }

    /// The full flat-text rendering: prefix, children, text, suffix for every
    /// node in document order.
    pub fn flat_text(&self) -> String {
        enum Step {
            Enter(NodeKey),
            Leave(NodeKey),
        }

        let mut out = String::new();
        let mut steps = vec![Step::Enter(self.root)];
        let mut budget = self.nodes.len().saturating_mul(2).saturating_add(2);
        while let Some(step) = steps.pop() {
            if budget == 0 {
                log::warn!(target: "doc_model.snapshot", "flat_text walk exceeded node count");
                break;
            }
            budget -= 1;
            match step {
                Step::Enter(key) => {
                    let Some(node) = self.nodes.get(&key) else {
                        continue;
                    };
                    out.push_str(node.prefix());
                    steps.push(Step::Leave(key));
                    steps.extend(node.children().iter().rev().map(|k| Step::Enter(*k)));
                }
                Step::Leave(key) => {
                    if let Some(node) = self.nodes.get(&key) {
                        out.push_str(node.own_text());
                        out.push_str(node.suffix());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let p = NodeKey(1);
        let t1 = NodeKey(2);
        let q = NodeKey(3);
        let t2 = NodeKey(4);
        let mut nodes = HashMap::new();
        nodes.insert(
            NodeKey::ROOT,
            Arc::new(Node::root().with_children(vec![p, q])),
        );
        nodes.insert(
            p,
            Arc::new(
                Node::element(p, "", "\n")
                    .with_parent(NodeKey::ROOT)
                    .with_children(vec![t1]),
            ),
        );
        nodes.insert(t1, Arc::new(Node::text(t1, "Hello").with_parent(p)));
        nodes.insert(
            q,
            Arc::new(
                Node::element(q, "> ", "\n")
                    .with_parent(NodeKey::ROOT)
                    .with_children(vec![t2]),
            ),
        );
        nodes.insert(t2, Arc::new(Node::text(t2, "quote").with_parent(q)));
        Snapshot::new(NodeKey::ROOT, nodes)
    }

    #[test]
    fn flat_text_concatenates_in_document_order() {
        assert_eq!(sample().flat_text(), "Hello\n> quote\n");
    }

    #[test]
    fn empty_snapshot_renders_nothing() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.flat_text(), "");
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn sibling_navigation() {
        let snapshot = sample();
        assert_eq!(snapshot.next_sibling(NodeKey(1)), Some(NodeKey(3)));
        assert_eq!(snapshot.next_sibling(NodeKey(3)), None);
        assert_eq!(snapshot.previous_sibling(NodeKey(3)), Some(NodeKey(1)));
        assert_eq!(snapshot.previous_sibling(NodeKey(1)), None);
        assert_eq!(snapshot.index_in_parent(NodeKey(3)), Some(1));
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let snapshot = sample();
        assert_eq!(snapshot.ancestors(NodeKey(4)), vec![NodeKey(3), NodeKey::ROOT]);
        assert!(snapshot.ancestors(NodeKey::ROOT).is_empty());
    }

    #[test]
    fn document_order_is_preorder() {
        let order = sample().document_order();
        assert_eq!(
            order,
            vec![NodeKey::ROOT, NodeKey(1), NodeKey(2), NodeKey(3), NodeKey(4)]
        );
    }

    #[test]
    fn same_node_compares_identity() {
        let a = sample();
        let b = a.clone();
        assert!(a.same_node(&b, NodeKey(2)));
        let c = sample();
        assert!(!a.same_node(&c, NodeKey(2)));
        assert!(!a.same_node(&b, NodeKey(99)));
    }
}
