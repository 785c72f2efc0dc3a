//! Incremental snapshot diffing into flat-text edit scripts.
//!
//! Contract:
//! - Nodes are matched by stable `NodeKey`; a node that is pointer-identical
//!   in both snapshots and absent from the dirty set is never re-diffed, only
//!   re-stamped when an earlier sibling changed length.
//! - A dirty node deletes each non-empty old span at its previous location and
//!   inserts each non-empty new span at the running cursor, in the fixed order
//!   prefix, children, text, suffix.
//! - The next cache starts as a copy of the previous one and is only handed
//!   back on success; the caller decides when to commit it.
//!
//! Complexity: O(visited nodes). Unchanged subtrees at their old location are
//! skipped in O(1).

use crate::children::{ChildListOps, diff_children};
use crate::config::ReconcileConfig;
use crate::edit_script::{EditScript, NodePart};
use crate::error::{ReconcileError, Result, Side};
use crate::guard::TraversalGuard;
use crate::range_cache::{RangeCache, RangeCacheItem, TextRange};
use doc_model::{DirtySet, Node, NodeKey, Snapshot};
use std::sync::Arc;

/// Result of one successful pass.
#[derive(Clone, Debug)]
pub struct ReconcileOutput {
    pub script: EditScript,
    pub cache: RangeCache,
    /// Length of the next flat text.
    pub text_length: usize,
    /// Node visits spent, including subtree creation and destruction.
    pub visited: usize,
}

/// Diffs `prev` against `next` and returns the edit script plus the next
/// range cache. `prev_cache` is read only.
pub fn reconcile(
    prev: &Snapshot,
    next: &Snapshot,
    dirty: &DirtySet,
    prev_cache: &RangeCache,
    config: &ReconcileConfig,
) -> Result<ReconcileOutput> {
    #[cfg(feature = "reconcile-guards")]
    crate::reconcile_guards::record_pass();

    let mut state = ReconcilerState::new(prev, next, dirty, prev_cache, config);
    if prev.root() == next.root() {
        state.reconcile_node(next.root())?;
    } else {
        log::debug!(
            target: "text_reconciler.diff",
            "root changed from {} to {}; rebuilding",
            prev.root(),
            next.root()
        );
        state.destroy_node(prev.root())?;
        state.create_node(next.root())?;
    }
    state.finish(config)
}

/// Builds the cache and an insert-only script for `next` from an empty
/// surface.
pub fn reconcile_from_empty(next: &Snapshot, config: &ReconcileConfig) -> Result<ReconcileOutput> {
    #[cfg(feature = "reconcile-guards")]
    crate::reconcile_guards::record_pass();

    let empty_cache = RangeCache::new();
    let empty_dirty = DirtySet::new();
    let mut state = ReconcilerState::new(next, next, &empty_dirty, &empty_cache, config);
    state.create_node(next.root())?;
    state.finish(config)
}

struct ReconcilerState<'a> {
    prev: &'a Snapshot,
    next: &'a Snapshot,
    dirty: &'a DirtySet,
    prev_cache: &'a RangeCache,
    next_cache: RangeCache,
    location_cursor: usize,
    script: EditScript,
    guard: TraversalGuard,
}

impl<'a> ReconcilerState<'a> {
    fn new(
        prev: &'a Snapshot,
        next: &'a Snapshot,
        dirty: &'a DirtySet,
        prev_cache: &'a RangeCache,
        config: &ReconcileConfig,
    ) -> Self {
        Self {
            prev,
            next,
            dirty,
            prev_cache,
            next_cache: prev_cache.clone(),
            location_cursor: 0,
            script: EditScript::new(),
            guard: TraversalGuard::new(config, prev.len() + next.len()),
        }
    }

    fn finish(mut self, config: &ReconcileConfig) -> Result<ReconcileOutput> {
        let pruned = self.next_cache.retain_live(self.next);
        if pruned > 0 {
            log::warn!(
                target: "text_reconciler.diff",
                "pruned {pruned} range cache entries for nodes missing from the next snapshot"
            );
        }
        if config.verify_lengths {
            self.next_cache.verify(self.next)?;
        }
        log::debug!(
            target: "text_reconciler.diff",
            "pass done: {} deletions, {} insertions, {} visits, text length {}",
            self.script.deletions.len(),
            self.script.insertions.len(),
            self.guard.visited(),
            self.location_cursor
        );
        Ok(ReconcileOutput {
            script: self.script,
            cache: self.next_cache,
            text_length: self.location_cursor,
            visited: self.guard.visited(),
        })
    }

    fn node(&self, side: Side, key: NodeKey) -> Result<Arc<Node>> {
        let snapshot = match side {
            Side::Previous => self.prev,
            Side::Next => self.next,
        };
        snapshot
            .get(key)
            .cloned()
            .ok_or(ReconcileError::MissingNode { key, side })
    }

    fn prev_range(&self, key: NodeKey) -> Result<RangeCacheItem> {
        self.prev_cache
            .get(key)
            .copied()
            .ok_or(ReconcileError::MissingRangeEntry(key))
    }

    /// Child keys of `node`, checked to exist in the snapshot on `side`.
    fn child_keys(&self, side: Side, node: &Node) -> Result<Vec<NodeKey>> {
        let snapshot = match side {
            Side::Previous => self.prev,
            Side::Next => self.next,
        };
        node.children()
            .iter()
            .map(|key| {
                if snapshot.contains(*key) {
                    Ok(*key)
                } else {
                    Err(ReconcileError::MissingNode { key: *key, side })
                }
            })
            .collect()
    }

    fn reconcile_node(&mut self, key: NodeKey) -> Result<()> {
        self.guard.enter()?;
        let result = self.reconcile_node_inner(key);
        self.guard.leave();
        result
    }

    fn reconcile_node_inner(&mut self, key: NodeKey) -> Result<()> {
        let prev_node = self.node(Side::Previous, key)?;
        let next_node = self.node(Side::Next, key)?;
        let prev_range = self.prev_range(key)?;

        if Arc::ptr_eq(&prev_node, &next_node) && !self.dirty.is_dirty(key) {
            if prev_range.location == self.location_cursor {
                #[cfg(feature = "reconcile-guards")]
                crate::reconcile_guards::record_fast_path();
                self.location_cursor += prev_range.total_length();
                return Ok(());
            }
            return self.update_location_of_non_dirty_node(key);
        }

        #[cfg(feature = "reconcile-guards")]
        crate::reconcile_guards::record_dirty_node();
        log::trace!(target: "text_reconciler.diff", "reconcile {key} at {}", self.location_cursor);

        let mut next_item = RangeCacheItem {
            location: self.location_cursor,
            ..RangeCacheItem::default()
        };

        next_item.prefix_length = next_node.prefix_len();
        self.replace_part(key, prev_range.prefix_range(), next_item.prefix_length, NodePart::Prefix);

        let cursor_before_children = self.location_cursor;
        let prev_children = self.child_keys(Side::Previous, &prev_node)?;
        let next_children = self.child_keys(Side::Next, &next_node)?;
        diff_children(&prev_children, &next_children, self)?;
        next_item.children_length = self.location_cursor - cursor_before_children;

        next_item.text_length = next_node.text_len();
        self.replace_part(key, prev_range.text_range(), next_item.text_length, NodePart::Text);

        next_item.suffix_length = next_node.suffix_len();
        self.replace_part(key, prev_range.suffix_range(), next_item.suffix_length, NodePart::Suffix);

        self.next_cache.set(key, next_item);
        Ok(())
    }

    /// Deletes the old span (if any) and inserts the new one (if any) at the
    /// cursor.
    fn replace_part(&mut self, key: NodeKey, prev: TextRange, next_length: usize, part: NodePart) {
        self.script.push_deletion(prev);
        self.script
            .push_insertion(key, part, self.location_cursor, next_length);
        self.location_cursor += next_length;
    }

    /// Re-stamps `key` and its descendants at the cursor; content is unchanged.
    fn update_location_of_non_dirty_node(&mut self, key: NodeKey) -> Result<()> {
        self.guard.enter()?;
        let result = self.update_location_inner(key);
        self.guard.leave();
        result
    }

    fn update_location_inner(&mut self, key: NodeKey) -> Result<()> {
        let mut next_item = self.prev_range(key)?;
        next_item.location = self.location_cursor;
        self.next_cache.set(key, next_item);

        let next_node = self.node(Side::Next, key)?;
        self.location_cursor += next_item.prefix_length;
        for child in self.child_keys(Side::Next, &next_node)? {
            self.update_location_of_non_dirty_node(child)?;
        }
        self.location_cursor += next_item.text_length + next_item.suffix_length;
        Ok(())
    }

    /// Inserts the whole subtree of `key` at the cursor.
    fn create_node(&mut self, key: NodeKey) -> Result<()> {
        self.guard.enter()?;
        let result = self.create_node_inner(key);
        self.guard.leave();
        result
    }

    fn create_node_inner(&mut self, key: NodeKey) -> Result<()> {
        #[cfg(feature = "reconcile-guards")]
        crate::reconcile_guards::record_created_node();

        let next_node = self.node(Side::Next, key)?;
        let mut next_item = RangeCacheItem {
            location: self.location_cursor,
            ..RangeCacheItem::default()
        };

        next_item.prefix_length = next_node.prefix_len();
        self.insert_part(key, next_item.prefix_length, NodePart::Prefix);

        let cursor_before_children = self.location_cursor;
        for child in self.child_keys(Side::Next, &next_node)? {
            self.create_node(child)?;
        }
        next_item.children_length = self.location_cursor - cursor_before_children;

        next_item.text_length = next_node.text_len();
        self.insert_part(key, next_item.text_length, NodePart::Text);

        next_item.suffix_length = next_node.suffix_len();
        self.insert_part(key, next_item.suffix_length, NodePart::Suffix);

        self.next_cache.set(key, next_item);
        Ok(())
    }

    fn insert_part(&mut self, key: NodeKey, length: usize, part: NodePart) {
        self.script
            .push_insertion(key, part, self.location_cursor, length);
        self.location_cursor += length;
    }

    /// Deletes every span of the previous subtree of `key`.
    fn destroy_node(&mut self, key: NodeKey) -> Result<()> {
        self.guard.enter()?;
        let result = self.destroy_node_inner(key);
        self.guard.leave();
        result
    }

    fn destroy_node_inner(&mut self, key: NodeKey) -> Result<()> {
        #[cfg(feature = "reconcile-guards")]
        crate::reconcile_guards::record_destroyed_node();

        let prev_node = self.node(Side::Previous, key)?;
        let prev_range = self.prev_range(key)?;

        self.script.push_deletion(prev_range.prefix_range());
        for child in self.child_keys(Side::Previous, &prev_node)? {
            self.destroy_node(child)?;
        }
        self.script.push_deletion(prev_range.text_range());
        self.script.push_deletion(prev_range.suffix_range());

        // A moved node keeps the entry its create half writes.
        if !self.next.contains(key) {
            self.next_cache.remove(key);
        }
        Ok(())
    }
}

impl ChildListOps for ReconcilerState<'_> {
    type Error = ReconcileError;

    fn reconcile_child(&mut self, key: NodeKey) -> Result<()> {
        self.reconcile_node(key)
    }

    fn create_child(&mut self, key: NodeKey) -> Result<()> {
        self.create_node(key)
    }

    fn destroy_child(&mut self, key: NodeKey) -> Result<()> {
        self.destroy_node(key)
    }
}
