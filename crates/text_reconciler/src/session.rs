//! Owns the committed range cache of one attached surface.
//!
//! Every pass works on a copy of the cache. The committed cache and the
//! frontend are only touched once the whole pass, including edit resolution,
//! has succeeded.

use crate::config::ReconcileConfig;
use crate::edit_script::{TextEdit, apply_edits};
use crate::error::Result;
use crate::frontend::TextFrontend;
use crate::locate::{LocatedOffset, locate_offset, map_offset_to_point};
use crate::range_cache::{RangeCache, TextRange};
use crate::reconcile::{ReconcileOutput, reconcile, reconcile_from_empty};
use crate::selection::{
    Point, Selection, map_point_to_offset, map_selection_to_range, selection_from_native_range,
};
use doc_model::{DirtySet, NodeKey, Snapshot, Transition};

/// Summary of one applied pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub deletions: usize,
    pub insertions: usize,
    pub deleted_chars: usize,
    pub inserted_chars: usize,
    pub visited_nodes: usize,
    /// Length of the flat text after the pass.
    pub text_length: usize,
}

impl PassReport {
    fn new(output: &ReconcileOutput, edits: &[TextEdit]) -> Self {
        let inserted_chars = edits
            .iter()
            .map(|edit| match edit {
                TextEdit::Insert { text, .. } => text.chars().count(),
                TextEdit::Delete { .. } => 0,
            })
            .sum();
        Self {
            deletions: output.script.deletions.len(),
            insertions: output.script.insertions.len(),
            deleted_chars: output.script.deleted_chars(),
            inserted_chars,
            visited_nodes: output.visited,
            text_length: output.text_length,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.deletions == 0 && self.insertions == 0
    }
}

#[derive(Debug)]
pub struct TextSession {
    cache: RangeCache,
    config: ReconcileConfig,
    passes: u64,
}

impl TextSession {
    /// A session for a surface showing an empty document rooted at `root`.
    pub fn new(root: NodeKey, config: ReconcileConfig) -> Self {
        Self {
            cache: RangeCache::with_empty_root(root),
            config,
            passes: 0,
        }
    }

    /// Renders `snapshot` into an empty `frontend` and takes ownership of
    /// the resulting cache.
    pub fn attach<F: TextFrontend + ?Sized>(
        snapshot: &Snapshot,
        config: ReconcileConfig,
        frontend: &mut F,
    ) -> Result<(Self, PassReport)> {
        let output = reconcile_from_empty(snapshot, &config)?;
        let mut session = Self {
            cache: RangeCache::new(),
            config,
            passes: 0,
        };
        let report = session.commit(output, snapshot, frontend)?;
        Ok((session, report))
    }

    pub fn update<F: TextFrontend + ?Sized>(
        &mut self,
        transition: &Transition,
        frontend: &mut F,
    ) -> Result<PassReport> {
        self.update_with(
            &transition.previous,
            &transition.next,
            &transition.dirty,
            frontend,
        )
    }

    pub fn update_with<F: TextFrontend + ?Sized>(
        &mut self,
        prev: &Snapshot,
        next: &Snapshot,
        dirty: &DirtySet,
        frontend: &mut F,
    ) -> Result<PassReport> {
        let output = match reconcile(prev, next, dirty, &self.cache, &self.config) {
            Ok(output) => output,
            Err(err) => {
                log::warn!(
                    target: "text_reconciler.session",
                    "pass {} aborted, committed cache kept: {err}",
                    self.passes + 1
                );
                return Err(err);
            }
        };
        self.commit(output, next, frontend)
    }

    fn commit<F: TextFrontend + ?Sized>(
        &mut self,
        output: ReconcileOutput,
        next: &Snapshot,
        frontend: &mut F,
    ) -> Result<PassReport> {
        let edits = output.script.resolve(next)?;
        let report = PassReport::new(&output, &edits);
        apply_edits(&edits, frontend);
        self.cache = output.cache;
        self.passes += 1;
        log::debug!(
            target: "text_reconciler.session",
            "pass {}: {report:?}",
            self.passes
        );
        Ok(report)
    }

    pub fn cache(&self) -> &RangeCache {
        &self.cache
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Passes committed so far, including the initial attach.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Accounts for a text edit the surface made on its own, so the cache
    /// matches `snapshot` without re-rendering. Returns the length delta.
    pub fn note_native_text_change(&mut self, snapshot: &Snapshot, key: NodeKey) -> Result<isize> {
        let mut working = self.cache.clone();
        let delta = working.apply_text_change(snapshot, key)?;
        self.cache = working;
        log::debug!(
            target: "text_reconciler.session",
            "native text change in {key}: delta {delta}"
        );
        Ok(delta)
    }

    pub fn locate_offset(&self, snapshot: &Snapshot, offset: usize) -> Result<Option<LocatedOffset>> {
        locate_offset(snapshot, &self.cache, offset, &self.config)
    }

    pub fn map_offset_to_point(&self, snapshot: &Snapshot, offset: usize) -> Result<Option<Point>> {
        map_offset_to_point(snapshot, &self.cache, offset, &self.config)
    }

    pub fn map_point_to_offset(&self, snapshot: &Snapshot, point: Point) -> Result<usize> {
        map_point_to_offset(snapshot, &self.cache, point)
    }

    pub fn map_selection_to_range(&self, snapshot: &Snapshot, selection: &Selection) -> Result<TextRange> {
        map_selection_to_range(snapshot, &self.cache, selection)
    }

    pub fn selection_from_native_range(
        &self,
        snapshot: &Snapshot,
        range: TextRange,
    ) -> Result<Option<Selection>> {
        selection_from_native_range(snapshot, &self.cache, range, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::frontend::{RecordingFrontend, TextBuffer};
    use doc_model::DocumentWriter;

    fn config() -> ReconcileConfig {
        ReconcileConfig {
            verify_lengths: true,
            ..ReconcileConfig::default()
        }
    }

    #[test]
    fn attach_then_update_keeps_buffer_in_sync() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "", "\n").expect("p");
        let t = writer.append_text(p, "one").expect("t");
        let first = writer.commit();

        let mut buffer = TextBuffer::new();
        let (mut session, report) = TextSession::attach(&first.next, config(), &mut buffer).expect("attach");
        assert_eq!(report.inserted_chars, 4);
        assert_eq!(buffer.text(), "one\n");

        writer.set_text(t, "two").expect("set text");
        let report = session.update(&writer.commit(), &mut buffer).expect("update");
        assert_eq!(buffer.text(), "two\n");
        // Text plus the dirty paragraph's suffix.
        assert_eq!(report.deleted_chars, 4);
        assert_eq!(report.inserted_chars, 4);
        assert_eq!(report.text_length, 4);
        assert_eq!(session.passes(), 2);
        assert_eq!(buffer.batches(), 2);
    }

    #[test]
    fn failed_pass_leaves_cache_and_frontend_untouched() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "", "").expect("p");
        let t = writer.append_text(p, "x").expect("t");
        let attached = writer.commit().next;
        let mut buffer = TextBuffer::new();
        let (mut session, _) = TextSession::attach(&attached, config(), &mut buffer).expect("attach");
        let committed = session.cache().clone();

        // A transition whose previous snapshot holds a node the cache never saw.
        let stray = writer.append_text(p, "y").expect("stray");
        let unseen = writer.commit();
        writer.set_text(stray, "z").expect("set text");
        writer.set_text(t, "w").expect("set text");
        let transition = writer.commit();

        let mut recorder = RecordingFrontend::default();
        let err = session
            .update(&transition, &mut recorder)
            .expect_err("stale cache must fail");
        assert_eq!(err, ReconcileError::MissingRangeEntry(stray));
        assert!(recorder.calls.is_empty());
        assert_eq!(session.cache(), &committed);
        assert_eq!(session.passes(), 1);

        session.update(&unseen, &mut buffer).expect("catch up");
        session.update(&transition, &mut buffer).expect("retry");
        assert_eq!(buffer.text(), "wz");
    }

    #[test]
    fn native_text_change_updates_cache_only() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "", "\n").expect("p");
        let t = writer.append_text(p, "ab").expect("t");
        let q = writer.append_element(NodeKey::ROOT, "", "\n").expect("q");
        let attached = writer.commit().next;
        let mut buffer = TextBuffer::new();
        let (mut session, _) = TextSession::attach(&attached, config(), &mut buffer).expect("attach");

        writer.set_text(t, "abc").expect("set text");
        let typed = writer.commit().next;
        assert_eq!(session.note_native_text_change(&typed, t), Ok(1));
        assert_eq!(session.cache().get(q).map(|i| i.location), Some(4));
        session.cache().verify(&typed).expect("consistent");
        assert_eq!(session.passes(), 1);
    }

    #[test]
    fn selection_queries_use_the_committed_cache() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "# ", "\n").expect("p");
        let t = writer.append_text(p, "Title").expect("t");
        let snapshot = writer.commit().next;
        let mut buffer = TextBuffer::new();
        let (session, _) = TextSession::attach(&snapshot, config(), &mut buffer).expect("attach");

        assert_eq!(
            session.map_offset_to_point(&snapshot, 4),
            Ok(Some(Point::text(t, 2)))
        );
        let selection = session
            .selection_from_native_range(&snapshot, TextRange::new(2, 5))
            .expect("map")
            .expect("anchored");
        assert_eq!(
            session.map_selection_to_range(&snapshot, &selection),
            Ok(TextRange::new(2, 5))
        );
    }
}
