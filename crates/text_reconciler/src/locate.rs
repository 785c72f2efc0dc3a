//! Flat offset -> document position.
//!
//! A recursive descent from the root that consults only the range cache and
//! the snapshot. Results classify where the offset landed:
//! - `Text` / `Element`: a usable anchor.
//! - `StartBoundary` / `EndBoundary`: exactly on a node edge. The parent turns
//!   these into an element anchor between its children; when several children
//!   report a boundary the last one wins, and any exact child match wins over
//!   all of them.
//! - `Illegal`: inside an opaque prefix or suffix span.

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::guard::TraversalGuard;
use crate::range_cache::RangeCache;
use crate::selection::{Point, PointKind};
use doc_model::{NodeKey, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocateKind {
    Text,
    Element,
    StartBoundary,
    EndBoundary,
    Illegal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocatedOffset {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: LocateKind,
}

impl LocatedOffset {
    fn new(key: NodeKey, offset: usize, kind: LocateKind) -> Self {
        Self { key, offset, kind }
    }

    fn is_anchor(&self) -> bool {
        matches!(self.kind, LocateKind::Text | LocateKind::Element)
    }
}

/// Classifies `offset` against the tree. `None` when no node's span (with
/// its end offset) contains it, or when the root has no cache entry.
pub fn locate_offset(
    snapshot: &Snapshot,
    cache: &RangeCache,
    offset: usize,
    config: &ReconcileConfig,
) -> Result<Option<LocatedOffset>> {
    let mut guard = TraversalGuard::new(config, snapshot.len());
    let located = evaluate_node(snapshot, cache, snapshot.root(), offset, &mut guard)?;
    log::trace!(
        target: "text_reconciler.locate",
        "offset {offset} -> {located:?} after {} visits",
        guard.visited()
    );
    Ok(located)
}

/// Like [`locate_offset`], keeping only results that can anchor a selection.
pub fn map_offset_to_point(
    snapshot: &Snapshot,
    cache: &RangeCache,
    offset: usize,
    config: &ReconcileConfig,
) -> Result<Option<Point>> {
    let located = locate_offset(snapshot, cache, offset, config)?;
    Ok(located.and_then(|located| {
        let kind = match located.kind {
            LocateKind::Text => PointKind::Text,
            LocateKind::Element => PointKind::Element,
            LocateKind::StartBoundary | LocateKind::EndBoundary | LocateKind::Illegal => {
                return None;
            }
        };
        Some(Point::new(located.key, located.offset, kind))
    }))
}

fn evaluate_node(
    snapshot: &Snapshot,
    cache: &RangeCache,
    key: NodeKey,
    offset: usize,
    guard: &mut TraversalGuard,
) -> Result<Option<LocatedOffset>> {
    guard.enter()?;
    let result = evaluate_node_inner(snapshot, cache, key, offset, guard);
    guard.leave();
    result
}

fn evaluate_node_inner(
    snapshot: &Snapshot,
    cache: &RangeCache,
    key: NodeKey,
    offset: usize,
    guard: &mut TraversalGuard,
) -> Result<Option<LocatedOffset>> {
    let (Some(item), Some(node)) = (cache.get(key), snapshot.get(key)) else {
        return Ok(None);
    };
    let entire = item.entire_range();
    if !entire.covers(offset) {
        return Ok(None);
    }

    if node.is_text() {
        let text = item.text_range();
        if text.covers(offset) {
            return Ok(Some(LocatedOffset::new(key, offset - text.location, LocateKind::Text)));
        }
    }

    if node.is_element() {
        let mut boundary = None;
        for (index, child) in node.children().iter().enumerate() {
            let Some(result) = evaluate_node(snapshot, cache, *child, offset, guard)? else {
                continue;
            };
            if result.is_anchor() {
                return Ok(Some(result));
            }
            match result.kind {
                LocateKind::StartBoundary => {
                    boundary = Some(LocatedOffset::new(key, index, LocateKind::Element));
                }
                LocateKind::EndBoundary => {
                    boundary = Some(LocatedOffset::new(key, index + 1, LocateKind::Element));
                }
                _ => {}
            }
        }
        if boundary.is_some() {
            return Ok(boundary);
        }
    }

    if entire.is_empty() {
        let kind = if offset == item.location {
            LocateKind::Element
        } else {
            LocateKind::StartBoundary
        };
        return Ok(Some(LocatedOffset::new(key, 0, kind)));
    }

    if offset == item.location {
        let kind = if item.prefix_length == 0 && node.is_element() {
            LocateKind::Element
        } else {
            LocateKind::StartBoundary
        };
        return Ok(Some(LocatedOffset::new(key, 0, kind)));
    }

    if offset == entire.end() {
        return Ok(Some(LocatedOffset::new(key, 0, LocateKind::EndBoundary)));
    }

    Ok(Some(LocatedOffset::new(key, 0, LocateKind::Illegal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile_from_empty;
    use doc_model::DocumentWriter;

    struct Fixture {
        snapshot: Snapshot,
        cache: RangeCache,
        hello: NodeKey,
        world: NodeKey,
        empty: NodeKey,
    }

    /// `> Hello\n` `World\n` then an empty paragraph.
    fn fixture() -> Fixture {
        let mut writer = DocumentWriter::new();
        let quote = writer.append_element(NodeKey::ROOT, "> ", "\n").expect("quote");
        let hello = writer.append_text(quote, "Hello").expect("hello");
        let plain = writer.append_element(NodeKey::ROOT, "", "\n").expect("plain");
        let world = writer.append_text(plain, "World").expect("world");
        let empty = writer.append_element(NodeKey::ROOT, "", "").expect("empty");
        let snapshot = writer.commit().next;
        let cache = reconcile_from_empty(&snapshot, &ReconcileConfig::default())
            .expect("attach")
            .cache;
        Fixture {
            snapshot,
            cache,
            hello,
            world,
            empty,
        }
    }

    fn locate(fixture: &Fixture, offset: usize) -> Option<LocatedOffset> {
        locate_offset(&fixture.snapshot, &fixture.cache, offset, &ReconcileConfig::default())
            .expect("locate")
    }

    #[test]
    fn offsets_inside_text_are_text_points() {
        let f = fixture();
        assert_eq!(locate(&f, 4), Some(LocatedOffset::new(f.hello, 2, LocateKind::Text)));
        assert_eq!(locate(&f, 2), Some(LocatedOffset::new(f.hello, 0, LocateKind::Text)));
        assert_eq!(locate(&f, 7), Some(LocatedOffset::new(f.hello, 5, LocateKind::Text)));
    }

    #[test]
    fn offset_inside_prefix_is_illegal() {
        let f = fixture();
        assert_eq!(locate(&f, 1).map(|l| l.kind), Some(LocateKind::Illegal));
        assert_eq!(
            map_offset_to_point(&f.snapshot, &f.cache, 1, &ReconcileConfig::default()).expect("map"),
            None
        );
    }

    #[test]
    fn exact_match_wins_over_earlier_boundary() {
        let f = fixture();
        // 8 is both the end of the quote and the start of "World".
        assert_eq!(locate(&f, 8), Some(LocatedOffset::new(f.world, 0, LocateKind::Text)));
    }

    #[test]
    fn empty_element_is_an_element_point() {
        let f = fixture();
        assert_eq!(locate(&f, 14), Some(LocatedOffset::new(f.empty, 0, LocateKind::Element)));
    }

    #[test]
    fn past_the_end_has_no_result() {
        let f = fixture();
        assert_eq!(locate(&f, 15), None);
    }

    #[test]
    fn start_boundary_becomes_parent_element_point() {
        let f = fixture();
        // Offset 0 is the quote's start; its prefix is not addressable.
        assert_eq!(
            locate(&f, 0),
            Some(LocatedOffset::new(NodeKey::ROOT, 0, LocateKind::Element))
        );
        assert_eq!(
            map_offset_to_point(&f.snapshot, &f.cache, 0, &ReconcileConfig::default()).expect("map"),
            Some(Point::new(NodeKey::ROOT, 0, PointKind::Element))
        );
    }

    #[test]
    fn last_boundary_wins_between_siblings() {
        let mut writer = DocumentWriter::new();
        let a = writer.append_element(NodeKey::ROOT, "[", "]").expect("a");
        writer.append_element(NodeKey::ROOT, "[", "]").expect("b");
        writer.append_text(a, "x").expect("x");
        let snapshot = writer.commit().next;
        let cache = reconcile_from_empty(&snapshot, &ReconcileConfig::default())
            .expect("attach")
            .cache;
        // "[x][]": 3 is the end of a and the start of b.
        let located = locate_offset(&snapshot, &cache, 3, &ReconcileConfig::default()).expect("locate");
        assert_eq!(located, Some(LocatedOffset::new(NodeKey::ROOT, 1, LocateKind::Element)));
    }

    #[test]
    fn missing_root_entry_yields_none() {
        let f = fixture();
        let empty_cache = RangeCache::new();
        let located =
            locate_offset(&f.snapshot, &empty_cache, 0, &ReconcileConfig::default()).expect("locate");
        assert_eq!(located, None);
    }
}
