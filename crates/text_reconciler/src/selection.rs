//! Document positions and their flat-text offsets.

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result, Side};
use crate::locate::map_offset_to_point;
use crate::range_cache::{RangeCache, TextRange};
use doc_model::{NodeKey, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointKind {
    /// `offset` counts chars into a text node.
    Text,
    /// `offset` is a child index of an element; `0` is before the first child.
    Element,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointKind,
}

impl Point {
    pub fn new(key: NodeKey, offset: usize, kind: PointKind) -> Self {
        Self { key, offset, kind }
    }

    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self::new(key, offset, PointKind::Text)
    }

    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self::new(key, offset, PointKind::Element)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Flat offset of `point`.
pub fn map_point_to_offset(snapshot: &Snapshot, cache: &RangeCache, point: Point) -> Result<usize> {
    let node = snapshot.get(point.key).ok_or(ReconcileError::MissingNode {
        key: point.key,
        side: Side::Next,
    })?;
    let item = cache
        .get(point.key)
        .ok_or(ReconcileError::MissingRangeEntry(point.key))?;
    let invalid = ReconcileError::InvalidPoint {
        key: point.key,
        offset: point.offset,
    };

    match point.kind {
        PointKind::Text => {
            if !node.is_text() {
                return Err(ReconcileError::NotTextNode(point.key));
            }
            if point.offset > item.text_length {
                return Err(invalid);
            }
            Ok(item.text_range().location + point.offset)
        }
        PointKind::Element => {
            if !node.is_element() {
                return Err(invalid);
            }
            if point.offset == 0 {
                return Ok(item.children_range().location);
            }
            let before = *node.children().get(point.offset - 1).ok_or(invalid)?;
            let before_item = cache
                .get(before)
                .ok_or(ReconcileError::MissingRangeEntry(before))?;
            Ok(before_item.entire_range().end())
        }
    }
}

/// The flat span between a selection's ends, start first.
pub fn map_selection_to_range(
    snapshot: &Snapshot,
    cache: &RangeCache,
    selection: &Selection,
) -> Result<TextRange> {
    let anchor = map_point_to_offset(snapshot, cache, selection.anchor)?;
    let focus = map_point_to_offset(snapshot, cache, selection.focus)?;
    let start = anchor.min(focus);
    Ok(TextRange::new(start, anchor.max(focus) - start))
}

/// Maps a surface-reported range back to a selection anchored at
/// `range.location` with its focus at `range.end()`. `None` when either end
/// has no usable anchor.
pub fn selection_from_native_range(
    snapshot: &Snapshot,
    cache: &RangeCache,
    range: TextRange,
    config: &ReconcileConfig,
) -> Result<Option<Selection>> {
    let Some(anchor) = map_offset_to_point(snapshot, cache, range.location, config)? else {
        log::warn!(
            target: "text_reconciler.locate",
            "no anchor for selection start {}",
            range.location
        );
        return Ok(None);
    };
    if range.is_empty() {
        return Ok(Some(Selection::collapsed(anchor)));
    }
    let Some(focus) = map_offset_to_point(snapshot, cache, range.end(), config)? else {
        log::warn!(
            target: "text_reconciler.locate",
            "no anchor for selection end {}",
            range.end()
        );
        return Ok(None);
    };
    Ok(Some(Selection::new(anchor, focus)))
}
