//! Keyed child-list diff shared by every reconciliation target.
//!
//! Contract:
//! - Children are matched by stable [`NodeKey`], never by position.
//! - The scan runs front to back over both lists, so operations are
//!   discovered in document order on both sides.
//! - Every previous key is reconciled or destroyed exactly once; every next
//!   key is reconciled or created exactly once.
//! - There is no move primitive: a reorder is a destroy plus a create.
//!   `ChildListOps::move_child` lets a target observe the pair as one event.
//!
//! Complexity: O(n + m) plus two position maps built on the first mismatch.

use doc_model::NodeKey;
use std::collections::HashMap;
use std::convert::Infallible;

/// What create/destroy/keep mean for a particular target surface.
pub trait ChildListOps {
    type Error;

    /// Same key at the current position on both sides.
    fn reconcile_child(&mut self, key: NodeKey) -> Result<(), Self::Error>;
    fn create_child(&mut self, key: NodeKey) -> Result<(), Self::Error>;
    fn destroy_child(&mut self, key: NodeKey) -> Result<(), Self::Error>;

    /// Both keys still appear later on the opposite side.
    fn move_child(&mut self, destroyed: NodeKey, created: NodeKey) -> Result<(), Self::Error> {
        self.destroy_child(destroyed)?;
        self.create_child(created)
    }
}

pub fn diff_children<O: ChildListOps + ?Sized>(
    prev: &[NodeKey],
    next: &[NodeKey],
    ops: &mut O,
) -> Result<(), O::Error> {
    let mut prev_index = 0;
    let mut next_index = 0;
    let mut prev_positions: Option<HashMap<NodeKey, usize>> = None;
    let mut next_positions: Option<HashMap<NodeKey, usize>> = None;

    while prev_index < prev.len() && next_index < next.len() {
        let prev_key = prev[prev_index];
        let next_key = next[next_index];

        if prev_key == next_key {
            ops.reconcile_child(next_key)?;
            prev_index += 1;
            next_index += 1;
            continue;
        }

        // Membership is checked against the unscanned remainder only.
        let prev_positions = prev_positions.get_or_insert_with(|| positions(prev));
        let next_positions = next_positions.get_or_insert_with(|| positions(next));
        let next_has_prev = next_positions
            .get(&prev_key)
            .is_some_and(|&index| index >= next_index);
        let prev_has_next = prev_positions
            .get(&next_key)
            .is_some_and(|&index| index >= prev_index);

        if !next_has_prev {
            ops.destroy_child(prev_key)?;
            prev_index += 1;
        } else if !prev_has_next {
            ops.create_child(next_key)?;
            next_index += 1;
        } else {
            ops.move_child(prev_key, next_key)?;
            prev_index += 1;
            next_index += 1;
        }
    }

    for key in &prev[prev_index..] {
        ops.destroy_child(*key)?;
    }
    for key in &next[next_index..] {
        ops.create_child(*key)?;
    }
    Ok(())
}

fn positions(keys: &[NodeKey]) -> HashMap<NodeKey, usize> {
    keys.iter()
        .enumerate()
        .map(|(index, key)| (*key, index))
        .collect()
}

/// Structural view of a child-list diff, as a DOM-like surface would apply it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildOp {
    Keep(NodeKey),
    Create(NodeKey),
    Destroy(NodeKey),
    Move { destroyed: NodeKey, created: NodeKey },
}

#[derive(Clone, Debug, Default)]
pub struct ChildOpRecorder {
    pub ops: Vec<ChildOp>,
}

impl ChildListOps for ChildOpRecorder {
    type Error = Infallible;

    fn reconcile_child(&mut self, key: NodeKey) -> Result<(), Infallible> {
        self.ops.push(ChildOp::Keep(key));
        Ok(())
    }

    fn create_child(&mut self, key: NodeKey) -> Result<(), Infallible> {
        self.ops.push(ChildOp::Create(key));
        Ok(())
    }

    fn destroy_child(&mut self, key: NodeKey) -> Result<(), Infallible> {
        self.ops.push(ChildOp::Destroy(key));
        Ok(())
    }

    fn move_child(&mut self, destroyed: NodeKey, created: NodeKey) -> Result<(), Infallible> {
        self.ops.push(ChildOp::Move { destroyed, created });
        Ok(())
    }
}

/// Runs the diff against a [`ChildOpRecorder`].
pub fn classify_children(prev: &[NodeKey], next: &[NodeKey]) -> Vec<ChildOp> {
    let mut recorder = ChildOpRecorder::default();
    match diff_children(prev, next, &mut recorder) {
        Ok(()) => recorder.ops,
        Err(never) => match never {},
    }
}
