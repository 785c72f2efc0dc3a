//! Replays a [`Scenario`] against a [`TextSession`] and a [`TextBuffer`].
//!
//! After every pass the runner checks that the surface equals the
//! document's flat text and that the committed cache is consistent with the
//! document. Any failed check stops the run.

use crate::error::ScenarioError;
use crate::model::{NodeSpec, ROOT_LABEL, Scenario, Step};
use crate::{diff_lines, escape_text};
use doc_model::{DocumentWriter, NodeKey, Snapshot};
use serde::Serialize;
use std::collections::HashMap;
use text_reconciler::{
    FrontendCall, PassReport, RangeCache, TextBuffer, TextFrontend, TextSession,
};

/// One committed pass.
#[derive(Clone, Debug)]
pub struct PassRecord {
    /// Index of the `commit` step; `None` for the initial attach.
    pub step: Option<usize>,
    pub report: PassReport,
    pub calls: Vec<FrontendCall>,
    pub text: String,
}

#[derive(Debug)]
pub struct ScenarioRun {
    pub passes: Vec<PassRecord>,
    pub final_text: String,
    pub cache: RangeCache,
    pub labels: HashMap<String, NodeKey>,
}

/// A flat row of the range cache, for reports.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CacheRow {
    pub key: u32,
    pub label: Option<String>,
    pub location: usize,
    pub prefix_length: usize,
    pub children_length: usize,
    pub text_length: usize,
    pub suffix_length: usize,
}

impl ScenarioRun {
    /// Cache rows sorted by location, then key.
    pub fn cache_rows(&self) -> Vec<CacheRow> {
        let names: HashMap<NodeKey, &str> = self
            .labels
            .iter()
            .map(|(label, key)| (*key, label.as_str()))
            .collect();
        let mut rows: Vec<CacheRow> = self
            .cache
            .iter()
            .map(|(key, item)| CacheRow {
                key: key.0,
                label: names.get(&key).map(|name| name.to_string()),
                location: item.location,
                prefix_length: item.prefix_length,
                children_length: item.children_length,
                text_length: item.text_length,
                suffix_length: item.suffix_length,
            })
            .collect();
        rows.sort_by_key(|row| (row.location, row.key));
        rows
    }
}

/// Forwards every call to the buffer and keeps a copy.
struct Tee<'a> {
    buffer: &'a mut TextBuffer,
    calls: Vec<FrontendCall>,
}

impl TextFrontend for Tee<'_> {
    fn begin_editing(&mut self) {
        self.calls.push(FrontendCall::BeginEditing);
        self.buffer.begin_editing();
    }

    fn delete(&mut self, location: usize, length: usize) {
        self.calls.push(FrontendCall::Delete { location, length });
        self.buffer.delete(location, length);
    }

    fn insert(&mut self, text: &str, location: usize) {
        self.calls.push(FrontendCall::Insert {
            location,
            text: text.to_string(),
        });
        self.buffer.insert(text, location);
    }

    fn end_editing(&mut self) {
        self.calls.push(FrontendCall::EndEditing);
        self.buffer.end_editing();
    }
}

struct Runner {
    writer: DocumentWriter,
    session: TextSession,
    buffer: TextBuffer,
    labels: HashMap<String, NodeKey>,
    passes: Vec<PassRecord>,
}

pub fn run(scenario: &Scenario) -> Result<ScenarioRun, ScenarioError> {
    let mut writer = DocumentWriter::new();
    let mut labels = HashMap::new();
    labels.insert(ROOT_LABEL.to_string(), writer.snapshot().root());
    let root = writer.snapshot().root();
    for spec in &scenario.document {
        build_node(&mut writer, &mut labels, root, spec)?;
    }
    let attached = writer.commit().next;

    let mut buffer = TextBuffer::new();
    let mut tee = Tee {
        buffer: &mut buffer,
        calls: Vec::new(),
    };
    let (session, report) = TextSession::attach(&attached, scenario.config.clone(), &mut tee)
        .map_err(|source| ScenarioError::Reconcile { step: 0, source })?;
    let calls = tee.calls;

    let mut runner = Runner {
        writer,
        session,
        buffer,
        labels,
        passes: Vec::new(),
    };
    runner.check_surface(0, &attached)?;
    runner.passes.push(PassRecord {
        step: None,
        report,
        calls,
        text: runner.buffer.text(),
    });
    log::debug!(target: "scenario", "'{}' attached: {report:?}", scenario.name);

    for (index, step) in scenario.steps.iter().enumerate() {
        runner.apply(index, step)?;
    }

    Ok(ScenarioRun {
        passes: runner.passes,
        final_text: runner.buffer.text(),
        cache: runner.session.cache().clone(),
        labels: runner.labels,
    })
}

fn build_node(
    writer: &mut DocumentWriter,
    labels: &mut HashMap<String, NodeKey>,
    parent: NodeKey,
    spec: &NodeSpec,
) -> Result<(), ScenarioError> {
    let document = |source| ScenarioError::Document { step: 0, source };
    match spec {
        NodeSpec::Element {
            label,
            prefix,
            suffix,
            children,
        } => {
            let key = writer
                .append_element(parent, prefix.as_str(), suffix.as_str())
                .map_err(document)?;
            register(labels, label.as_deref(), key)?;
            for child in children {
                build_node(writer, labels, key, child)?;
            }
        }
        NodeSpec::Text { label, text } => {
            let key = writer.append_text(parent, text.as_str()).map_err(document)?;
            register(labels, label.as_deref(), key)?;
        }
    }
    Ok(())
}

fn register(
    labels: &mut HashMap<String, NodeKey>,
    label: Option<&str>,
    key: NodeKey,
) -> Result<(), ScenarioError> {
    let Some(label) = label else {
        return Ok(());
    };
    if labels.insert(label.to_string(), key).is_some() {
        return Err(ScenarioError::DuplicateLabel(label.to_string()));
    }
    Ok(())
}

impl Runner {
    fn key(&self, label: &str) -> Result<NodeKey, ScenarioError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownLabel(label.to_string()))
    }

    fn apply(&mut self, step: usize, op: &Step) -> Result<(), ScenarioError> {
        let document = |source| ScenarioError::Document { step, source };
        match op {
            Step::SetText { node, text } => {
                let key = self.key(node)?;
                self.writer.set_text(key, text.as_str()).map_err(document)?;
            }
            Step::SetPrefix { node, prefix } => {
                let key = self.key(node)?;
                self.writer.set_prefix(key, prefix.as_str()).map_err(document)?;
            }
            Step::SetSuffix { node, suffix } => {
                let key = self.key(node)?;
                self.writer.set_suffix(key, suffix.as_str()).map_err(document)?;
            }
            Step::InsertText {
                parent,
                index,
                text,
                label,
            } => {
                let parent = self.key(parent)?;
                let key = match index {
                    Some(index) => self.writer.insert_text(parent, *index, text.as_str()),
                    None => self.writer.append_text(parent, text.as_str()),
                }
                .map_err(document)?;
                register(&mut self.labels, label.as_deref(), key)?;
            }
            Step::InsertElement {
                parent,
                index,
                prefix,
                suffix,
                label,
            } => {
                let parent = self.key(parent)?;
                let key = match index {
                    Some(index) => {
                        self.writer
                            .insert_element(parent, *index, prefix.as_str(), suffix.as_str())
                    }
                    None => self
                        .writer
                        .append_element(parent, prefix.as_str(), suffix.as_str()),
                }
                .map_err(document)?;
                register(&mut self.labels, label.as_deref(), key)?;
            }
            Step::Remove { node } => {
                let key = self.key(node)?;
                self.writer.remove(key).map_err(document)?;
            }
            Step::Move {
                node,
                parent,
                index,
            } => {
                let key = self.key(node)?;
                let parent = self.key(parent)?;
                self.writer.move_node(key, parent, *index).map_err(document)?;
            }
            Step::Commit {
                expect_text,
                expect_deletions,
                expect_insertions,
            } => {
                let report = self.commit(step)?;
                if let Some(expected) = expect_text {
                    self.expect_text(step, expected)?;
                }
                if let Some(expected) = expect_deletions {
                    expect_count(step, "deletions", *expected, report.deletions)?;
                }
                if let Some(expected) = expect_insertions {
                    expect_count(step, "insertions", *expected, report.insertions)?;
                }
            }
            Step::NativeTextChange { node, text } => self.native_text_change(step, node, text)?,
            Step::ExpectText { text } => self.expect_text(step, text)?,
            Step::ExpectPoint {
                offset,
                node,
                point_offset,
            } => self.expect_point(step, *offset, node.as_deref(), *point_offset)?,
        }
        Ok(())
    }

    fn commit(&mut self, step: usize) -> Result<PassReport, ScenarioError> {
        let transition = self.writer.commit();
        let mut tee = Tee {
            buffer: &mut self.buffer,
            calls: Vec::new(),
        };
        let report = self
            .session
            .update(&transition, &mut tee)
            .map_err(|source| ScenarioError::Reconcile { step, source })?;
        let calls = tee.calls;
        self.check_surface(step, &transition.next)?;
        log::debug!(target: "scenario", "step {step}: {report:?}");
        self.passes.push(PassRecord {
            step: Some(step),
            report,
            calls,
            text: self.buffer.text(),
        });
        Ok(report)
    }

    /// Applies a text change to the surface directly, then lets the session
    /// account for it without a pass.
    fn native_text_change(&mut self, step: usize, node: &str, text: &str) -> Result<(), ScenarioError> {
        if self.writer.has_pending_changes() {
            return Err(ScenarioError::Expectation {
                step,
                message: "native_text_change needs all edits committed first".to_string(),
            });
        }
        let key = self.key(node)?;
        let old_range = self
            .session
            .cache()
            .get(key)
            .map(|item| item.text_range())
            .ok_or(ScenarioError::Reconcile {
                step,
                source: text_reconciler::ReconcileError::MissingRangeEntry(key),
            })?;
        self.writer
            .set_text(key, text)
            .map_err(|source| ScenarioError::Document { step, source })?;
        let typed = self.writer.commit().next;

        self.buffer.begin_editing();
        self.buffer.delete(old_range.location, old_range.length);
        self.buffer.insert(text, old_range.location);
        self.buffer.end_editing();

        self.session
            .note_native_text_change(&typed, key)
            .map_err(|source| ScenarioError::Reconcile { step, source })?;
        self.check_surface(step, &typed)
    }

    fn check_surface(&self, step: usize, snapshot: &Snapshot) -> Result<(), ScenarioError> {
        if !self.buffer.errors().is_empty() {
            return Err(ScenarioError::Frontend {
                step,
                errors: self.buffer.errors().to_vec(),
            });
        }
        let expected = snapshot.flat_text();
        let actual = self.buffer.text();
        if expected != actual {
            return Err(ScenarioError::SurfaceDiverged {
                step,
                diff: text_diff(&expected, &actual),
            });
        }
        self.session
            .cache()
            .verify(snapshot)
            .map_err(|source| ScenarioError::Reconcile { step, source })
    }

    fn expect_text(&self, step: usize, expected: &str) -> Result<(), ScenarioError> {
        let actual = self.buffer.text();
        if actual != expected {
            return Err(ScenarioError::Expectation {
                step,
                message: format!("unexpected surface text\n{}", text_diff(expected, &actual)),
            });
        }
        Ok(())
    }

    fn expect_point(
        &self,
        step: usize,
        offset: usize,
        node: Option<&str>,
        point_offset: Option<usize>,
    ) -> Result<(), ScenarioError> {
        let point = self
            .session
            .map_offset_to_point(self.writer.snapshot(), offset)
            .map_err(|source| ScenarioError::Reconcile { step, source })?;
        let expected = node.map(|label| self.key(label)).transpose()?;
        let matches = match (point, expected) {
            (None, None) => true,
            (Some(point), Some(key)) => {
                point.key == key && point_offset.is_none_or(|offset| point.offset == offset)
            }
            _ => false,
        };
        if !matches {
            return Err(ScenarioError::Expectation {
                step,
                message: format!(
                    "offset {offset}: expected {:?} at {point_offset:?}, got {point:?}",
                    node
                ),
            });
        }
        Ok(())
    }
}

fn expect_count(step: usize, what: &str, expected: usize, actual: usize) -> Result<(), ScenarioError> {
    if expected != actual {
        return Err(ScenarioError::Expectation {
            step,
            message: format!("expected {expected} {what}, got {actual}"),
        });
    }
    Ok(())
}

fn text_diff(expected: &str, actual: &str) -> String {
    let lines = |text: &str| -> Vec<String> { text.split('\n').map(escape_text).collect() };
    diff_lines(&lines(expected), &lines(actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_str(source: &str) -> Result<ScenarioRun, ScenarioError> {
        run(&Scenario::from_toml_str(source).expect("parse"))
    }

    #[test]
    fn commit_applies_pass_and_records_calls() {
        let run = run_str(
            r#"
            name = "edit"
            [[document]]
            kind = "element"
            children = [{ kind = "text", label = "t", text = "ab" }]

            [[steps]]
            op = "set_text"
            node = "t"
            text = "abc"

            [[steps]]
            op = "commit"
            expect_text = "abc"
            expect_deletions = 1
            expect_insertions = 1
            "#,
        )
        .expect("run");
        assert_eq!(run.passes.len(), 2);
        assert_eq!(run.passes[1].step, Some(1));
        assert_eq!(
            run.passes[1].calls,
            vec![
                FrontendCall::BeginEditing,
                FrontendCall::Delete {
                    location: 0,
                    length: 2
                },
                FrontendCall::Insert {
                    location: 0,
                    text: "abc".to_string()
                },
                FrontendCall::EndEditing,
            ]
        );
        assert_eq!(run.final_text, "abc");
    }

    #[test]
    fn failed_expectation_names_the_step() {
        let err = run_str(
            r#"
            name = "wrong"
            [[document]]
            kind = "text"
            text = "x"

            [[steps]]
            op = "expect_text"
            text = "y"
            "#,
        )
        .expect_err("mismatch");
        assert!(matches!(err, ScenarioError::Expectation { step: 0, .. }));
    }

    #[test]
    fn unknown_label_is_reported() {
        let err = run_str(
            r#"
            name = "missing"
            [[steps]]
            op = "remove"
            node = "nope"
            "#,
        )
        .expect_err("unknown label");
        assert!(matches!(err, ScenarioError::UnknownLabel(label) if label == "nope"));
    }

    #[test]
    fn native_text_change_keeps_cache_in_step() {
        let run = run_str(
            r#"
            name = "typing"
            [[document]]
            kind = "element"
            suffix = "\n"
            children = [{ kind = "text", label = "a", text = "ab" }]
            [[document]]
            kind = "element"
            label = "second"
            children = [{ kind = "text", label = "b", text = "cd" }]

            [[steps]]
            op = "native_text_change"
            node = "a"
            text = "abXY"

            [[steps]]
            op = "expect_point"
            offset = 5
            node = "b"
            point_offset = 0
            "#,
        )
        .expect("run");
        assert_eq!(run.final_text, "abXY\ncd");
        assert_eq!(run.passes.len(), 1, "native typing runs no pass");
        let second = run.labels["second"];
        assert_eq!(run.cache.get(second).map(|item| item.location), Some(5));
    }

    #[test]
    fn cache_rows_serialize_with_labels() {
        let run = run_str(
            r#"
            name = "rows"
            [[document]]
            kind = "element"
            prefix = "> "
            children = [{ kind = "text", label = "t", text = "ab" }]
            "#,
        )
        .expect("run");
        let json = serde_json::to_value(run.cache_rows()).expect("serialize");
        let rows = json.as_array().expect("array");
        assert_eq!(rows.len(), 3);
        let text_row = rows
            .iter()
            .find(|row| row["label"] == "t")
            .expect("labelled row");
        assert_eq!(text_row["location"], 2);
        assert_eq!(text_row["text_length"], 2);
    }
}
