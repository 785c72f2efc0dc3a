//! The flat-text rendering surface protocol.
//!
//! A surface is driven only through `insert`/`delete` with char offsets.
//! Every pass is bracketed by `begin_editing`/`end_editing`; a surface must
//! defer its own change notifications until the batch ends so observers never
//! see an intermediate state.

/// A flat-text rendering surface.
pub trait TextFrontend {
    fn begin_editing(&mut self);
    fn delete(&mut self, location: usize, length: usize);
    fn insert(&mut self, text: &str, location: usize);
    fn end_editing(&mut self);
}

/// One recorded frontend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrontendCall {
    BeginEditing,
    Delete { location: usize, length: usize },
    Insert { location: usize, text: String },
    EndEditing,
}

/// Records the call sequence without interpreting it.
#[derive(Clone, Debug, Default)]
pub struct RecordingFrontend {
    pub calls: Vec<FrontendCall>,
}

impl TextFrontend for RecordingFrontend {
    fn begin_editing(&mut self) {
        self.calls.push(FrontendCall::BeginEditing);
    }

    fn delete(&mut self, location: usize, length: usize) {
        self.calls.push(FrontendCall::Delete { location, length });
    }

    fn insert(&mut self, text: &str, location: usize) {
        self.calls.push(FrontendCall::Insert {
            location,
            text: text.to_string(),
        });
    }

    fn end_editing(&mut self) {
        self.calls.push(FrontendCall::EndEditing);
    }
}

/// In-memory surface holding the flat text as chars.
///
/// Out-of-range edits and unbalanced batches are rejected and logged to
/// [`TextBuffer::errors`] instead of panicking, so tests can assert on them.
///
/// ```
/// use text_reconciler::{TextBuffer, TextFrontend};
///
/// let mut buffer = TextBuffer::from_text("Hello");
/// buffer.begin_editing();
/// buffer.insert(" world", 5);
/// buffer.end_editing();
/// assert_eq!(buffer.text(), "Hello world");
/// ```
#[derive(Clone, Debug, Default)]
pub struct TextBuffer {
    chars: Vec<char>,
    in_batch: bool,
    batches: usize,
    errors: Vec<String>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Completed editing batches.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn in_batch(&self) -> bool {
        self.in_batch
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn reject(&mut self, message: String) {
        log::warn!(target: "text_reconciler.frontend", "{message}");
        self.errors.push(message);
    }
}

impl TextFrontend for TextBuffer {
    fn begin_editing(&mut self) {
        if self.in_batch {
            self.reject("begin_editing while a batch is open".to_string());
        }
        self.in_batch = true;
    }

    fn delete(&mut self, location: usize, length: usize) {
        if !self.in_batch {
            self.reject(format!("delete({location}, {length}) outside a batch"));
        }
        let end = location.saturating_add(length);
        if end > self.chars.len() {
            self.reject(format!(
                "delete({location}, {length}) past end of {} chars",
                self.chars.len()
            ));
            return;
        }
        self.chars.drain(location..end);
    }

    fn insert(&mut self, text: &str, location: usize) {
        if !self.in_batch {
            self.reject(format!("insert at {location} outside a batch"));
        }
        if location > self.chars.len() {
            self.reject(format!(
                "insert at {location} past end of {} chars",
                self.chars.len()
            ));
            return;
        }
        self.chars.splice(location..location, text.chars());
    }

    fn end_editing(&mut self) {
        if !self.in_batch {
            self.reject("end_editing without an open batch".to_string());
            return;
        }
        self.in_batch = false;
        self.batches += 1;
    }
}
