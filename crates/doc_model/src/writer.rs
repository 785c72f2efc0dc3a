//! Copy-on-write document mutation.
//!
//! The writer keeps a working node map whose entries are shared with the last
//! committed [`Snapshot`]. Touching a node clones its payload once per commit
//! cycle, so untouched nodes stay pointer-identical across snapshots.
//!
//! Every mutation marks the touched node dirty and marks each ancestor as a
//! non-intentional dirty element; the reconciler relies on this to find
//! changed descendants below otherwise unchanged parents.

use crate::dirty::DirtySet;
use crate::snapshot::Snapshot;
use crate::types::{Node, NodeKey};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("unknown node {0}")]
    UnknownNode(NodeKey),
    #[error("node {0} cannot hold children or markup")]
    NotAnElement(NodeKey),
    #[error("node {0} is not a text node")]
    NotAText(NodeKey),
    #[error("index {index} out of bounds for {parent} with {len} children")]
    IndexOutOfBounds {
        parent: NodeKey,
        index: usize,
        len: usize,
    },
    #[error("the root node cannot be removed or moved")]
    RootImmutable,
    #[error("moving {node} under {parent} would create a cycle")]
    Cycle { node: NodeKey, parent: NodeKey },
}

/// One committed change: the snapshot pair plus what changed between them.
#[derive(Clone, Debug)]
pub struct Transition {
    pub previous: Snapshot,
    pub next: Snapshot,
    pub dirty: DirtySet,
}

#[derive(Debug)]
pub struct DocumentWriter {
    committed: Snapshot,
    working: HashMap<NodeKey, Arc<Node>>,
    dirty: DirtySet,
    next_key: u32,
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::empty())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_key = snapshot
            .keys()
            .map(|key| key.0)
            .max()
            .map_or(1, |max| max.saturating_add(1));
        let working = snapshot.nodes().clone();
        Self {
            committed: snapshot,
            working,
            dirty: DirtySet::new(),
            next_key,
        }
    }

    /// The last committed snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.committed
    }

    /// The uncommitted state as a snapshot. Does not reset the dirty set.
    pub fn working_snapshot(&self) -> Snapshot {
        Snapshot::new(self.committed.root(), self.working.clone())
    }

    /// Reads the working (uncommitted) state.
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.working.get(&key).map(|node| node.as_ref())
    }

    pub fn pending_dirty(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn append_element(
        &mut self,
        parent: NodeKey,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<NodeKey, DocumentError> {
        let index = self.child_count(parent)?;
        self.insert_element(parent, index, prefix, suffix)
    }

    pub fn insert_element(
        &mut self,
        parent: NodeKey,
        index: usize,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<NodeKey, DocumentError> {
        self.insert_node(parent, index, |key| Node::element(key, prefix, suffix))
    }

    pub fn append_text(
        &mut self,
        parent: NodeKey,
        text: impl Into<String>,
    ) -> Result<NodeKey, DocumentError> {
        let index = self.child_count(parent)?;
        self.insert_text(parent, index, text)
    }

    pub fn insert_text(
        &mut self,
        parent: NodeKey,
        index: usize,
        text: impl Into<String>,
    ) -> Result<NodeKey, DocumentError> {
        self.insert_node(parent, index, |key| Node::text(key, text))
    }

    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), DocumentError> {
        let node = self.working.get(&key).ok_or(DocumentError::UnknownNode(key))?;
        if !node.is_text() {
            return Err(DocumentError::NotAText(key));
        }
        self.node_mut(key)?.text = text.into();
        self.mark(key);
        Ok(())
    }

    pub fn set_prefix(&mut self, key: NodeKey, prefix: impl Into<String>) -> Result<(), DocumentError> {
        self.ensure_element(key)?;
        self.node_mut(key)?.prefix = prefix.into();
        self.mark(key);
        Ok(())
    }

    pub fn set_suffix(&mut self, key: NodeKey, suffix: impl Into<String>) -> Result<(), DocumentError> {
        self.ensure_element(key)?;
        self.node_mut(key)?.suffix = suffix.into();
        self.mark(key);
        Ok(())
    }

    /// Removes `key` and its whole subtree.
    pub fn remove(&mut self, key: NodeKey) -> Result<(), DocumentError> {
        if key == self.committed.root() {
            return Err(DocumentError::RootImmutable);
        }
        let node = self.working.get(&key).ok_or(DocumentError::UnknownNode(key))?;
        let parent = node.parent();

        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != key);
            self.mark(parent);
        }

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(removed) = self.working.remove(&current) {
                stack.extend(removed.children().iter().copied());
            }
            self.dirty.leaves.remove(&current);
            self.dirty.elements.remove(&current);
        }
        log::trace!(target: "doc_model.writer", "removed subtree {key}");
        Ok(())
    }

    /// Moves `key` (with its subtree) to `index` among `new_parent`'s
    /// children. `index` is interpreted after `key` left its old position.
    pub fn move_node(
        &mut self,
        key: NodeKey,
        new_parent: NodeKey,
        index: usize,
    ) -> Result<(), DocumentError> {
        if key == self.committed.root() {
            return Err(DocumentError::RootImmutable);
        }
        let node = self.working.get(&key).ok_or(DocumentError::UnknownNode(key))?;
        let old_parent = node.parent();
        self.ensure_element(new_parent)?;
        if new_parent == key || self.is_ancestor(key, new_parent) {
            return Err(DocumentError::Cycle {
                node: key,
                parent: new_parent,
            });
        }
        let mut len = self.child_count(new_parent)?;
        if old_parent == Some(new_parent) {
            len -= 1;
        }
        if index > len {
            return Err(DocumentError::IndexOutOfBounds {
                parent: new_parent,
                index,
                len,
            });
        }

        if let Some(old_parent) = old_parent {
            self.node_mut(old_parent)?.children.retain(|child| *child != key);
            self.mark(old_parent);
        }
        self.node_mut(new_parent)?.children.insert(index, key);
        self.node_mut(key)?.parent = Some(new_parent);
        self.mark(new_parent);
        self.mark(key);
        Ok(())
    }

    /// Freezes the working state into a new snapshot.
    pub fn commit(&mut self) -> Transition {
        let next = Snapshot::new(self.committed.root(), self.working.clone());
        let previous = std::mem::replace(&mut self.committed, next.clone());
        let dirty = std::mem::take(&mut self.dirty);
        log::debug!(
            target: "doc_model.writer",
            "commit: {} nodes, {} dirty leaves, {} dirty elements",
            next.len(),
            dirty.leaves.len(),
            dirty.elements.len()
        );
        Transition {
            previous,
            next,
            dirty,
        }
    }

    fn insert_node(
        &mut self,
        parent: NodeKey,
        index: usize,
        build: impl FnOnce(NodeKey) -> Node,
    ) -> Result<NodeKey, DocumentError> {
        self.ensure_element(parent)?;
        let len = self.child_count(parent)?;
        if index > len {
            return Err(DocumentError::IndexOutOfBounds { parent, index, len });
        }
        let key = NodeKey(self.next_key);
        self.next_key = self.next_key.saturating_add(1);

        let node = build(key).with_parent(parent);
        self.working.insert(key, Arc::new(node));
        self.node_mut(parent)?.children.insert(index, key);
        self.mark(parent);
        self.mark(key);
        Ok(key)
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut Node, DocumentError> {
        self.working
            .get_mut(&key)
            .map(Arc::make_mut)
            .ok_or(DocumentError::UnknownNode(key))
    }

    fn child_count(&self, parent: NodeKey) -> Result<usize, DocumentError> {
        self.working
            .get(&parent)
            .map(|node| node.children().len())
            .ok_or(DocumentError::UnknownNode(parent))
    }

    fn ensure_element(&self, key: NodeKey) -> Result<(), DocumentError> {
        match self.working.get(&key) {
            Some(node) if node.is_element() => Ok(()),
            Some(_) => Err(DocumentError::NotAnElement(key)),
            None => Err(DocumentError::UnknownNode(key)),
        }
    }

    fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = self.working.get(&key).and_then(|node| node.parent());
        let mut steps = 0usize;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.working.len() {
                return false;
            }
            current = self.working.get(&parent).and_then(|node| node.parent());
        }
        false
    }

    fn mark(&mut self, key: NodeKey) {
        let Some(node) = self.working.get(&key) else {
            return;
        };
        if node.is_text() {
            self.dirty.mark_leaf(key);
        } else {
            self.dirty.mark_element(key, true);
        }
        let mut current = node.parent();
        let mut steps = 0usize;
        while let Some(parent) = current {
            self.dirty.mark_element(parent, false);
            steps += 1;
            if steps > self.working.len() {
                break;
            }
            current = self.working.get(&parent).and_then(|node| node.parent());
        }
    }
}
