//! Ordered edit scripts for the flat-text surface.
//!
//! Invariants:
//! - Deletions are anchored to the previous flat text and are discovered in
//!   ascending location order; they are replayed in reverse, so no deletion
//!   shifts the offsets of one still pending.
//! - Insertions are anchored to the next flat text and are replayed in
//!   discovery order, after every deletion.
//! - Zero-length operations are never emitted.

use crate::error::{ReconcileError, Result, Side};
use crate::frontend::TextFrontend;
use crate::range_cache::TextRange;
use doc_model::{NodeKey, Snapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodePart {
    Prefix,
    Text,
    Suffix,
}

/// Insert `part` of `key` (as found in the next snapshot) at `location`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub key: NodeKey,
    pub part: NodePart,
    pub location: usize,
}

/// A resolved surface operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextEdit {
    Delete { location: usize, length: usize },
    Insert { location: usize, text: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditScript {
    pub deletions: Vec<TextRange>,
    pub insertions: Vec<Insertion>,
}

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.insertions.is_empty()
    }

    pub(crate) fn push_deletion(&mut self, range: TextRange) {
        if !range.is_empty() {
            self.deletions.push(range);
        }
    }

    pub(crate) fn push_insertion(&mut self, key: NodeKey, part: NodePart, location: usize, length: usize) {
        if length > 0 {
            self.insertions.push(Insertion {
                key,
                part,
                location,
            });
        }
    }

    /// Total characters removed from the previous flat text.
    pub fn deleted_chars(&self) -> usize {
        self.deletions.iter().map(|range| range.length).sum()
    }

    /// Turns the script into the exact call sequence for a surface: every
    /// deletion in reverse discovery order, then every insertion with its
    /// string read from `next`.
    pub fn resolve(&self, next: &Snapshot) -> Result<Vec<TextEdit>> {
        let mut edits = Vec::with_capacity(self.deletions.len() + self.insertions.len());
        for range in self.deletions.iter().rev() {
            if range.length > 0 {
                edits.push(TextEdit::Delete {
                    location: range.location,
                    length: range.length,
                });
            }
        }
        for insertion in &self.insertions {
            let text = insertion_text(insertion, next)?;
            if !text.is_empty() {
                edits.push(TextEdit::Insert {
                    location: insertion.location,
                    text,
                });
            }
        }
        Ok(edits)
    }

    /// Resolves the script and drives `frontend` through one editing batch.
    /// Nothing reaches the frontend if resolution fails.
    pub fn replay<F: TextFrontend + ?Sized>(&self, next: &Snapshot, frontend: &mut F) -> Result<Vec<TextEdit>> {
        let edits = self.resolve(next)?;
        apply_edits(&edits, frontend);
        Ok(edits)
    }
}

pub(crate) fn apply_edits<F: TextFrontend + ?Sized>(edits: &[TextEdit], frontend: &mut F) {
    frontend.begin_editing();
    for edit in edits {
        match edit {
            TextEdit::Delete { location, length } => frontend.delete(*location, *length),
            TextEdit::Insert { location, text } => frontend.insert(text, *location),
        }
    }
    frontend.end_editing();
}

fn insertion_text(insertion: &Insertion, next: &Snapshot) -> Result<String> {
    let node = next.get(insertion.key).ok_or(ReconcileError::MissingNode {
        key: insertion.key,
        side: Side::Next,
    })?;
    let text = match insertion.part {
        NodePart::Prefix => node.prefix(),
        NodePart::Text => node.own_text(),
        NodePart::Suffix => node.suffix(),
    };
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{FrontendCall, RecordingFrontend};
    use doc_model::DocumentWriter;

    #[test]
    fn zero_length_operations_are_dropped() {
        let mut script = EditScript::new();
        script.push_deletion(TextRange::new(4, 0));
        script.push_insertion(NodeKey(1), NodePart::Text, 0, 0);
        assert!(script.is_empty());
    }

    #[test]
    fn resolve_reverses_deletions_only() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "> ", "\n").expect("p");
        let t = writer.append_text(p, "abc").expect("t");
        let next = writer.commit().next;

        let mut script = EditScript::new();
        script.push_deletion(TextRange::new(0, 2));
        script.push_deletion(TextRange::new(5, 3));
        script.push_insertion(p, NodePart::Prefix, 0, 2);
        script.push_insertion(t, NodePart::Text, 2, 3);
        script.push_insertion(p, NodePart::Suffix, 5, 1);

        let edits = script.resolve(&next).expect("resolve");
        assert_eq!(
            edits,
            vec![
                TextEdit::Delete {
                    location: 5,
                    length: 3
                },
                TextEdit::Delete {
                    location: 0,
                    length: 2
                },
                TextEdit::Insert {
                    location: 0,
                    text: "> ".to_string()
                },
                TextEdit::Insert {
                    location: 2,
                    text: "abc".to_string()
                },
                TextEdit::Insert {
                    location: 5,
                    text: "\n".to_string()
                },
            ]
        );
        assert_eq!(script.deleted_chars(), 5);
    }

    #[test]
    fn replay_wraps_edits_in_one_batch() {
        let mut writer = DocumentWriter::new();
        let p = writer.append_element(NodeKey::ROOT, "", "").expect("p");
        let t = writer.append_text(p, "hi").expect("t");
        let next = writer.commit().next;

        let mut script = EditScript::new();
        script.push_insertion(t, NodePart::Text, 0, 2);
        let mut frontend = RecordingFrontend::default();
        script.replay(&next, &mut frontend).expect("replay");
        assert_eq!(
            frontend.calls,
            vec![
                FrontendCall::BeginEditing,
                FrontendCall::Insert {
                    location: 0,
                    text: "hi".to_string()
                },
                FrontendCall::EndEditing,
            ]
        );
    }

    #[test]
    fn missing_insertion_node_fails_before_any_call() {
        let next = Snapshot::empty();
        let mut script = EditScript::new();
        script.push_insertion(NodeKey(9), NodePart::Text, 0, 1);
        let mut frontend = RecordingFrontend::default();
        assert_eq!(
            script.replay(&next, &mut frontend),
            Err(ReconcileError::MissingNode {
                key: NodeKey(9),
                side: Side::Next
            })
        );
        assert!(frontend.calls.is_empty());
    }
}
