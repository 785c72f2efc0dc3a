//! Scenario file format.
//!
//! ```toml
//! name = "paragraph edit"
//!
//! [config]
//! verify_lengths = true
//!
//! [[document]]
//! kind = "element"
//! label = "p"
//! suffix = "\n"
//! children = [{ kind = "text", label = "t", text = "Hello" }]
//!
//! [[steps]]
//! op = "set_text"
//! node = "t"
//! text = "Hello world"
//!
//! [[steps]]
//! op = "commit"
//! expect_text = "Hello world\n"
//! ```
//!
//! Nodes are referred to by label; `root` always names the document root.

use crate::error::ScenarioError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use text_reconciler::ReconcileConfig;

pub const ROOT_LABEL: &str = "root";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
    #[default]
    Active,
    Skip,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: FixtureStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub config: ReconcileConfig,
    #[serde(default)]
    pub document: Vec<NodeSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Initial document content, children of the root in order.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum NodeSpec {
    Element {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
        #[serde(default)]
        children: Vec<NodeSpec>,
    },
    Text {
        #[serde(default)]
        label: Option<String>,
        text: String,
    },
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    SetText {
        node: String,
        text: String,
    },
    SetPrefix {
        node: String,
        prefix: String,
    },
    SetSuffix {
        node: String,
        suffix: String,
    },
    /// Appends when `index` is absent.
    InsertText {
        parent: String,
        #[serde(default)]
        index: Option<usize>,
        text: String,
        #[serde(default)]
        label: Option<String>,
    },
    InsertElement {
        parent: String,
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
        #[serde(default)]
        label: Option<String>,
    },
    Remove {
        node: String,
    },
    Move {
        node: String,
        parent: String,
        index: usize,
    },
    /// Commits pending edits and runs one reconciliation pass.
    Commit {
        #[serde(default)]
        expect_text: Option<String>,
        #[serde(default)]
        expect_deletions: Option<usize>,
        #[serde(default)]
        expect_insertions: Option<usize>,
    },
    /// The surface types into a text node itself; only the cache is updated.
    NativeTextChange {
        node: String,
        text: String,
    },
    ExpectText {
        text: String,
    },
    /// `node` absent means the offset must not anchor.
    ExpectPoint {
        offset: usize,
        #[serde(default)]
        node: Option<String>,
        #[serde(default)]
        point_offset: Option<usize>,
    },
}

impl Scenario {
    pub fn from_toml_str(source: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(source).map_err(ScenarioError::Parse)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        match self.status {
            FixtureStatus::Active if self.reason.is_some() => Err(ScenarioError::Invalid(format!(
                "scenario '{}' has a reason but is not skipped",
                self.name
            ))),
            FixtureStatus::Skip if self.reason.as_deref().unwrap_or("").is_empty() => {
                Err(ScenarioError::Invalid(format!(
                    "skipped scenario '{}' is missing a reason",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }
}
