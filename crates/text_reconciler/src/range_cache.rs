//! Per-node positions within the flat text.
//!
//! Each entry splits a node's footprint into four contiguous spans in fixed
//! order: prefix, children, text, suffix. `location` is where the prefix
//! starts. The cache performs no validation on `set`; the reconciler keeps
//! the invariants and [`RangeCache::verify`] checks them on demand.

use crate::error::{ReconcileError, Result, Side};
use doc_model::{NodeKey, Snapshot};
use std::collections::HashMap;

/// A span of the flat text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub location: usize,
    pub length: usize,
}

impl TextRange {
    pub fn new(location: usize, length: usize) -> Self {
        Self { location, length }
    }

    pub fn end(&self) -> usize {
        self.location + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// `location <= offset <= end`: the end offset counts as inside, so a
    /// caret sitting right after the span still resolves to it.
    pub fn covers(&self, offset: usize) -> bool {
        self.location <= offset && offset <= self.end()
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.location < other.end() && other.location < self.end()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangeCacheItem {
    pub location: usize,
    pub prefix_length: usize,
    pub children_length: usize,
    pub text_length: usize,
    pub suffix_length: usize,
}

impl RangeCacheItem {
    pub fn total_length(&self) -> usize {
        self.prefix_length + self.children_length + self.text_length + self.suffix_length
    }

    pub fn entire_range(&self) -> TextRange {
        TextRange::new(self.location, self.total_length())
    }

    pub fn prefix_range(&self) -> TextRange {
        TextRange::new(self.location, self.prefix_length)
    }

    pub fn children_range(&self) -> TextRange {
        TextRange::new(self.location + self.prefix_length, self.children_length)
    }

    pub fn text_range(&self) -> TextRange {
        TextRange::new(
            self.location + self.prefix_length + self.children_length,
            self.text_length,
        )
    }

    pub fn suffix_range(&self) -> TextRange {
        TextRange::new(
            self.location + self.prefix_length + self.children_length + self.text_length,
            self.suffix_length,
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeCache {
    items: HashMap<NodeKey, RangeCacheItem>,
}

impl RangeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache describing an empty document: a root spanning nothing at 0.
    pub fn with_empty_root(root: NodeKey) -> Self {
        let mut cache = Self::new();
        cache.set(root, RangeCacheItem::default());
        cache
    }

    pub fn get(&self, key: NodeKey) -> Option<&RangeCacheItem> {
        self.items.get(&key)
    }

    pub fn set(&mut self, key: NodeKey, item: RangeCacheItem) {
        self.items.insert(key, item);
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<RangeCacheItem> {
        self.items.remove(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.items.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &RangeCacheItem)> + '_ {
        self.items.iter().map(|(key, item)| (*key, item))
    }

    /// Drops entries whose node no longer exists in `snapshot`.
    /// Returns the number of entries removed.
    pub fn retain_live(&mut self, snapshot: &Snapshot) -> usize {
        let before = self.items.len();
        self.items.retain(|key, _| snapshot.contains(*key));
        before - self.items.len()
    }

    /// Checks that every node reachable in `snapshot` has an entry whose
    /// spans match the node's decomposition and whose children are laid out
    /// contiguously.
    pub fn verify(&self, snapshot: &Snapshot) -> Result<()> {
        let root = snapshot.root();
        let root_item = self.get(root).ok_or(ReconcileError::MissingRangeEntry(root))?;
        if root_item.location != 0 {
            return Err(ReconcileError::LengthMismatch {
                key: root,
                expected: 0,
                actual: root_item.location,
            });
        }

        for key in snapshot.document_order() {
            let node = snapshot.get(key).ok_or(ReconcileError::MissingNode {
                key,
                side: Side::Next,
            })?;
            let item = self.get(key).ok_or(ReconcileError::MissingRangeEntry(key))?;
            check_length(key, node.prefix_len(), item.prefix_length)?;
            check_length(key, node.text_len(), item.text_length)?;
            check_length(key, node.suffix_len(), item.suffix_length)?;

            let mut cursor = item.location + item.prefix_length;
            for child in node.children() {
                let child_item = self
                    .get(*child)
                    .ok_or(ReconcileError::MissingRangeEntry(*child))?;
                check_length(*child, cursor, child_item.location)?;
                cursor += child_item.total_length();
            }
            check_length(key, cursor - item.location - item.prefix_length, item.children_length)?;
        }
        Ok(())
    }

    /// Accounts for a text change the surface has already applied itself.
    ///
    /// Reads the new text length of `key` from `snapshot`, grows or shrinks
    /// every ancestor's children span by the difference and shifts every node
    /// that follows `key` in document order. No edits are produced. Returns
    /// the applied delta. Entries are only written once every update has been
    /// computed successfully.
    pub fn apply_text_change(&mut self, snapshot: &Snapshot, key: NodeKey) -> Result<isize> {
        let node = snapshot.get(key).ok_or(ReconcileError::MissingNode {
            key,
            side: Side::Next,
        })?;
        if !node.is_text() {
            return Err(ReconcileError::NotTextNode(key));
        }
        let mut item = *self.get(key).ok_or(ReconcileError::MissingRangeEntry(key))?;
        let new_length = node.text_len();
        let delta = new_length as isize - item.text_length as isize;
        if delta == 0 {
            return Ok(0);
        }

        let mut updates = Vec::new();
        item.text_length = new_length;
        updates.push((key, item));

        for ancestor in snapshot.ancestors(key) {
            let mut ancestor_item = *self
                .get(ancestor)
                .ok_or(ReconcileError::MissingRangeEntry(ancestor))?;
            ancestor_item.children_length = ancestor_item
                .children_length
                .checked_add_signed(delta)
                .ok_or(ReconcileError::InvalidDelta { key, delta })?;
            updates.push((ancestor, ancestor_item));
        }

        let order = snapshot.document_order();
        let following = order
            .iter()
            .position(|k| *k == key)
            .map_or(&[][..], |index| &order[index + 1..]);
        for later in following {
            let mut later_item = *self
                .get(*later)
                .ok_or(ReconcileError::MissingRangeEntry(*later))?;
            later_item.location = later_item
                .location
                .checked_add_signed(delta)
                .ok_or(ReconcileError::InvalidDelta { key, delta })?;
            updates.push((*later, later_item));
        }

        log::trace!(
            target: "text_reconciler.cache",
            "text change at {key}: delta {delta}, {} entries updated",
            updates.len()
        );
        for (k, updated) in updates {
            self.set(k, updated);
        }
        Ok(delta)
    }
}

fn check_length(key: NodeKey, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ReconcileError::LengthMismatch {
            key,
            expected,
            actual,
        });
    }
    Ok(())
}
