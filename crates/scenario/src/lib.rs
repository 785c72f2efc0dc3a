//! TOML edit scenarios for the text reconciler.
//!
//! A scenario describes an initial document and a list of edit steps. The
//! runner attaches a [`text_reconciler::TextSession`] to an in-memory surface,
//! replays the steps and checks the surface against the document after every
//! pass.

mod error;
mod model;
mod runner;

pub use error::ScenarioError;
pub use model::{FixtureStatus, NodeSpec, ROOT_LABEL, Scenario, Step};
pub use runner::{CacheRow, PassRecord, ScenarioRun, run};

use std::fs;
use std::path::{Path, PathBuf};

/// Escapes control characters so flat text fits on one report line.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch < ' ' => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\u{{{:02X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Shows the first differing line with two lines of context.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    use std::fmt::Write;
    let max = expected.len().max(actual.len());
    let missing = "<missing>";
    let mut out = String::new();
    let mismatch = (0..max).find(|i| expected.get(*i) != actual.get(*i));
    if let Some(i) = mismatch {
        let start = i.saturating_sub(2);
        let end = (i + 3).min(max);
        let _ = writeln!(&mut out, "first mismatch at line {}:", i + 1);
        for line in start..end {
            let left = expected.get(line).map_or(missing, String::as_str);
            let right = actual.get(line).map_or(missing, String::as_str);
            let marker = if line == i { ">" } else { " " };
            let _ = writeln!(&mut out, "{marker} {:>4}  expected: {left}", line + 1);
            let _ = writeln!(&mut out, "{marker} {:>4}    actual: {right}", line + 1);
        }
    }
    let _ = writeln!(
        &mut out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}

/// The bundled fixtures directory.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Every `*.toml` scenario under `dir`, sorted by path.
pub fn load_dir(dir: &Path) -> Result<Vec<(PathBuf, Scenario)>, ScenarioError> {
    let io = |source| ScenarioError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();
    paths
        .into_iter()
        .map(|path| Scenario::load(&path).map(|scenario| (path, scenario)))
        .collect()
}
